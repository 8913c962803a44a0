//! Snapshot cache with per-resource single-flight.
//!
//! Each resource has at most one cached [`Snapshot`] and at most one
//! upstream fetch in flight. Callers that arrive while a fetch is running
//! wait for it and receive its outcome, success or failure.
//!
//! A snapshot younger than its TTL's `fresh` window is served without a
//! fetch. When a fetch fails, a snapshot younger than `fresh + stale_grace`
//! is served instead of the error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tokio::sync::OnceCell;

use crate::config::CacheTtl;
use crate::parse::ParsedPayload;
use crate::resource::Resource;
use crate::LittlefieldError;

/// How a lookup treats an already cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh snapshot if present; otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Fetch even if a fresh snapshot is present, then store the result.
    Refresh,
}

/// Parsed result of one successful fetch.
///
/// Snapshots are immutable; a newer fetch replaces the whole snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    resource: Resource,
    fetched_at: OffsetDateTime,
    fetched: Instant,
    payload: ParsedPayload,
}

impl Snapshot {
    pub fn new(resource: Resource, payload: ParsedPayload) -> Self {
        Self {
            resource,
            fetched_at: OffsetDateTime::now_utc(),
            fetched: Instant::now(),
            payload,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Wall-clock time of the fetch, UTC.
    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.fetched.elapsed()
    }

    pub fn payload(&self) -> &ParsedPayload {
        &self.payload
    }

    pub fn is_fresh(&self, ttl: &CacheTtl) -> bool {
        self.age() < ttl.fresh
    }
}

type Flight = Arc<OnceCell<Result<Arc<Snapshot>, LittlefieldError>>>;

enum Lookup {
    Fresh(Arc<Snapshot>),
    Join(Flight),
}

#[derive(Default)]
struct CacheInner {
    snapshots: RwLock<HashMap<Resource, Arc<Snapshot>>>,
    flights: Mutex<HashMap<Resource, Flight>>,
    upstream_fetches: AtomicU64,
}

/// Shared, cheaply cloneable snapshot store.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<CacheInner>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot for `resource`, fetching through `fetcher` when
    /// needed.
    ///
    /// `fetcher` runs only if this caller ends up leading a new flight; it
    /// is dropped unused when a fresh snapshot or a running flight exists.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        resource: Resource,
        ttl: CacheTtl,
        mode: CacheMode,
        fetcher: F,
    ) -> Result<Arc<Snapshot>, LittlefieldError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<ParsedPayload, LittlefieldError>> + Send,
    {
        let flight = match self.lookup(resource, &ttl, mode) {
            Lookup::Fresh(snapshot) => {
                tracing::debug!(
                    %resource,
                    age_ms = snapshot.age().as_millis() as u64,
                    "cache hit"
                );
                return Ok(snapshot);
            }
            Lookup::Join(flight) => flight,
        };

        let outcome = flight
            .get_or_init(|| async move {
                tracing::debug!(%resource, "cache miss; fetching upstream");
                self.inner.upstream_fetches.fetch_add(1, Ordering::Relaxed);
                let result = fetcher()
                    .await
                    .map(|payload| Arc::new(Snapshot::new(resource, payload)));
                if let Ok(snapshot) = &result {
                    self.store(Arc::clone(snapshot));
                }
                result
            })
            .await
            .clone();

        self.land(resource, &flight);

        match outcome {
            Ok(snapshot) => Ok(snapshot),
            Err(error) => match self.peek(resource) {
                Some(prior) if prior.age() <= ttl.max_age() => {
                    tracing::warn!(
                        %resource,
                        age_ms = prior.age().as_millis() as u64,
                        code = error.code(),
                        %error,
                        "fetch failed; serving stale snapshot"
                    );
                    Ok(prior)
                }
                _ => Err(error),
            },
        }
    }

    /// Current snapshot regardless of age.
    pub fn peek(&self, resource: Resource) -> Option<Arc<Snapshot>> {
        self.inner
            .snapshots
            .read()
            .expect("snapshot store lock is not poisoned")
            .get(&resource)
            .cloned()
    }

    /// Drops the snapshot so the next lookup fetches.
    pub fn invalidate(&self, resource: Resource) -> bool {
        self.inner
            .snapshots
            .write()
            .expect("snapshot store lock is not poisoned")
            .remove(&resource)
            .is_some()
    }

    pub fn clear(&self) {
        self.inner
            .snapshots
            .write()
            .expect("snapshot store lock is not poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .snapshots
            .read()
            .expect("snapshot store lock is not poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches this cache has started upstream.
    pub fn upstream_fetches(&self) -> u64 {
        self.inner.upstream_fetches.load(Ordering::Relaxed)
    }

    /// Decides between a fresh hit and a flight. Hits are served from the
    /// snapshot store alone; a miss is re-checked under the flight lock, so a
    /// caller either sees a finished flight's snapshot or joins the flight.
    fn lookup(&self, resource: Resource, ttl: &CacheTtl, mode: CacheMode) -> Lookup {
        if mode == CacheMode::Use {
            if let Some(snapshot) = self.peek(resource).filter(|s| s.is_fresh(ttl)) {
                return Lookup::Fresh(snapshot);
            }
        }

        let mut flights = self
            .inner
            .flights
            .lock()
            .expect("flight table lock is not poisoned");

        if mode == CacheMode::Use {
            if let Some(snapshot) = self.peek(resource).filter(|s| s.is_fresh(ttl)) {
                return Lookup::Fresh(snapshot);
            }
        }

        let flight = flights
            .entry(resource)
            .or_insert_with(|| Arc::new(OnceCell::new()));
        Lookup::Join(Arc::clone(flight))
    }

    fn store(&self, snapshot: Arc<Snapshot>) {
        self.inner
            .snapshots
            .write()
            .expect("snapshot store lock is not poisoned")
            .insert(snapshot.resource(), snapshot);
    }

    /// Retires a completed flight; later callers start a new one.
    fn land(&self, resource: Resource, flight: &Flight) {
        let mut flights = self
            .inner
            .flights
            .lock()
            .expect("flight table lock is not poisoned");
        if flights
            .get(&resource)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            flights.remove(&resource);
        }
    }
}
