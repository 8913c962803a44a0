//! # Factory Facade
//!
//! [`Littlefield`] exposes one query per business metric. Every query goes
//! through the snapshot cache with the resource's TTL and hands the typed
//! result back unchanged. Errors propagate untouched.
//!
//! The facade never fetches on its own initiative: callers decide the
//! polling cadence. It is cheap to clone, and clones share one cache and one
//! session.
//!
//! | Query | Resource | Returns |
//! |-------|----------|---------|
//! | [`Littlefield::cash`] | `cash` | [`DaySeries`] |
//! | [`Littlefield::live_day`] / [`Littlefield::live_cash`] | `cash` | latest point |
//! | [`Station::queue_size`] | `station/N/queue` | [`DaySeries`] |
//! | [`Station::utilization`] | `station/N/utilization` | [`DaySeries`] |
//! | [`Materials::info`] | `materials/info` | [`MaterialsInfo`] |
//! | [`Materials::inventory`] | `materials/inventory` | [`DaySeries`] |
//! | [`Orders::job_arrivals`] | `orders/arrivals` | [`DaySeries`] |
//! | [`CompletedJobs::lead_times`] | `jobs/leadtimes` | `Vec<`[`LabeledSeries`]`>` |

use std::sync::Arc;

use crate::cache::{CacheMode, Snapshot, SnapshotCache};
use crate::config::{LittlefieldConfig, TtlPolicy};
use crate::parse::{self, ParsedPayload};
use crate::resource::{PayloadShape, Resource};
use crate::session::{HttpSession, ResourceFetcher};
use crate::{
    DayPoint, DaySeries, LabeledSeries, LittlefieldError, MaterialsInfo, ParseError, StationId,
    ValidationError,
};

/// Live data facade for one team's factory.
#[derive(Clone)]
pub struct Littlefield {
    fetcher: Arc<dyn ResourceFetcher>,
    cache: SnapshotCache,
    ttl: Arc<TtlPolicy>,
}

impl Littlefield {
    /// Builds the facade over any fetcher; tests pass a fake here.
    pub fn new(ttl: TtlPolicy, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            cache: SnapshotCache::new(),
            ttl: Arc::new(ttl),
        }
    }

    /// Production wiring: validates `config` and opens an HTTP session.
    ///
    /// No request is made until the first query or [`login`](Self::login).
    pub fn connect(config: &LittlefieldConfig) -> Result<Self, LittlefieldError> {
        config.validate()?;
        let session = HttpSession::connect(config)?;
        Ok(Self::new(config.ttl.clone(), Arc::new(session)))
    }

    /// Logs in now rather than on the first query.
    pub async fn login(&self) -> Result<(), LittlefieldError> {
        self.fetcher.login().await
    }

    /// Closes the session and drops every snapshot.
    pub fn shutdown(&self) {
        self.fetcher.close();
        self.cache.clear();
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub async fn cash(&self) -> Result<DaySeries, LittlefieldError> {
        self.day_series(Resource::Cash).await
    }

    /// Most recent cash point. Shares the cache entry with [`cash`](Self::cash).
    pub async fn live_point(&self) -> Result<DayPoint, LittlefieldError> {
        let snapshot = self.snapshot(Resource::Cash, CacheMode::Use).await?;
        let series = expect_series(&snapshot)?;
        series.latest().ok_or_else(|| {
            LittlefieldError::from(ParseError::EmptySeries {
                resource: Resource::Cash.key(),
            })
        })
    }

    /// Current simulation day, for change detection.
    pub async fn live_day(&self) -> Result<u32, LittlefieldError> {
        self.live_point().await.map(|point| point.day)
    }

    pub async fn live_cash(&self) -> Result<f64, LittlefieldError> {
        self.live_point().await.map(|point| point.value)
    }

    /// Station by ordinal; only 1, 2 and 3 exist.
    pub fn station(&self, ordinal: u8) -> Result<Station<'_>, ValidationError> {
        StationId::try_from(ordinal).map(|id| self.station_by_id(id))
    }

    pub fn station_by_id(&self, id: StationId) -> Station<'_> {
        Station { factory: self, id }
    }

    pub fn stations(&self) -> [Station<'_>; 3] {
        StationId::ALL.map(|id| self.station_by_id(id))
    }

    pub fn materials(&self) -> Materials<'_> {
        Materials { factory: self }
    }

    pub fn orders(&self) -> Orders<'_> {
        Orders { factory: self }
    }

    pub fn completed_jobs(&self) -> CompletedJobs<'_> {
        CompletedJobs { factory: self }
    }

    /// Fetches `resource` even if its snapshot is fresh.
    pub async fn refresh(&self, resource: Resource) -> Result<Arc<Snapshot>, LittlefieldError> {
        self.snapshot(resource, CacheMode::Refresh).await
    }

    pub fn invalidate(&self, resource: Resource) -> bool {
        self.cache.invalidate(resource)
    }

    async fn snapshot(
        &self,
        resource: Resource,
        mode: CacheMode,
    ) -> Result<Arc<Snapshot>, LittlefieldError> {
        let ttl = self.ttl.for_resource(resource);
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .get_or_fetch(resource, ttl, mode, move || async move {
                let raw = fetcher.fetch(resource).await?;
                parse::parse(resource, &raw).map_err(LittlefieldError::from)
            })
            .await
    }

    async fn day_series(&self, resource: Resource) -> Result<DaySeries, LittlefieldError> {
        let snapshot = self.snapshot(resource, CacheMode::Use).await?;
        expect_series(&snapshot).cloned()
    }
}

fn expect_series(snapshot: &Snapshot) -> Result<&DaySeries, LittlefieldError> {
    match snapshot.payload() {
        ParsedPayload::Series(series) => Ok(series),
        other => Err(mismatch(snapshot.resource(), PayloadShape::DaySeries, other)),
    }
}

fn mismatch(resource: Resource, expected: PayloadShape, found: &ParsedPayload) -> LittlefieldError {
    LittlefieldError::from(ParseError::ShapeMismatch {
        resource: resource.key(),
        expected: expected.as_str(),
        found: found.shape().as_str(),
    })
}

/// One processing station. Stations share no state with each other.
#[derive(Clone, Copy)]
pub struct Station<'a> {
    factory: &'a Littlefield,
    id: StationId,
}

impl Station<'_> {
    pub fn id(&self) -> StationId {
        self.id
    }

    pub async fn queue_size(&self) -> Result<DaySeries, LittlefieldError> {
        self.factory
            .day_series(Resource::StationQueue(self.id))
            .await
    }

    pub async fn utilization(&self) -> Result<DaySeries, LittlefieldError> {
        self.factory
            .day_series(Resource::StationUtilization(self.id))
            .await
    }
}

/// Raw materials: ordering policy and inventory.
#[derive(Clone, Copy)]
pub struct Materials<'a> {
    factory: &'a Littlefield,
}

impl Materials<'_> {
    pub async fn info(&self) -> Result<MaterialsInfo, LittlefieldError> {
        let snapshot = self
            .factory
            .snapshot(Resource::MaterialsInfo, CacheMode::Use)
            .await?;
        match snapshot.payload() {
            ParsedPayload::Materials(info) => Ok(*info),
            other => Err(mismatch(
                Resource::MaterialsInfo,
                PayloadShape::Materials,
                other,
            )),
        }
    }

    pub async fn inventory(&self) -> Result<DaySeries, LittlefieldError> {
        self.factory.day_series(Resource::Inventory).await
    }
}

/// Incoming customer orders.
#[derive(Clone, Copy)]
pub struct Orders<'a> {
    factory: &'a Littlefield,
}

impl Orders<'_> {
    /// Jobs arriving per day.
    pub async fn job_arrivals(&self) -> Result<DaySeries, LittlefieldError> {
        self.factory.day_series(Resource::JobArrivals).await
    }
}

/// Jobs that have left the factory.
#[derive(Clone, Copy)]
pub struct CompletedJobs<'a> {
    factory: &'a Littlefield,
}

impl CompletedJobs<'_> {
    /// Lead-time series, one per contract, in upstream order.
    pub async fn lead_times(&self) -> Result<Vec<LabeledSeries>, LittlefieldError> {
        let snapshot = self
            .factory
            .snapshot(Resource::LeadTimes, CacheMode::Use)
            .await?;
        match snapshot.payload() {
            ParsedPayload::Labeled(series) => Ok(series.clone()),
            other => Err(mismatch(Resource::LeadTimes, PayloadShape::Labeled, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::RawPayload;
    use std::future::Future;
    use std::pin::Pin;

    struct StaticFetcher;

    impl ResourceFetcher for StaticFetcher {
        fn fetch<'a>(
            &'a self,
            resource: Resource,
        ) -> Pin<Box<dyn Future<Output = Result<RawPayload, LittlefieldError>> + Send + 'a>>
        {
            let body = match resource {
                Resource::Cash => "{points: '1 1000 2 1050 3 1200'}",
                Resource::MaterialsInfo => "<h2>Materials</h2>Reorder point: 1320",
                _ => "{points: ''}",
            };
            Box::pin(async move { Ok(RawPayload::new(body)) })
        }
    }

    fn factory() -> Littlefield {
        Littlefield::new(TtlPolicy::default(), Arc::new(StaticFetcher))
    }

    #[tokio::test]
    async fn live_reads_use_the_latest_cash_point() {
        let factory = factory();
        assert_eq!(factory.live_day().await, Ok(3));
        assert_eq!(factory.live_cash().await, Ok(1200.0));
        assert_eq!(factory.cache().upstream_fetches(), 1);
    }

    #[tokio::test]
    async fn empty_cash_series_has_no_live_day() {
        struct EmptyFetcher;
        impl ResourceFetcher for EmptyFetcher {
            fn fetch<'a>(
                &'a self,
                _resource: Resource,
            ) -> Pin<Box<dyn Future<Output = Result<RawPayload, LittlefieldError>> + Send + 'a>>
            {
                Box::pin(async { Ok(RawPayload::new("{points: ''}")) })
            }
        }

        let factory = Littlefield::new(TtlPolicy::default(), Arc::new(EmptyFetcher));
        let error = factory.live_day().await.expect_err("no points");
        assert!(matches!(
            error,
            LittlefieldError::Parse(ParseError::EmptySeries { .. })
        ));
    }

    #[test]
    fn out_of_range_station_is_rejected() {
        let factory = factory();
        assert!(factory.station(2).is_ok());
        assert_eq!(
            factory.station(4).err(),
            Some(ValidationError::StationOutOfRange { ordinal: 4 })
        );
    }

    #[tokio::test]
    async fn materials_info_reports_absent_fields() {
        let info = factory().materials().info().await.expect("parses");
        assert_eq!(info.reorder_point, Some(1320.0));
        assert_eq!(info.next_arrival_eta, None);
    }
}
