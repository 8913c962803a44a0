//! # Session Manager
//!
//! Owns the authenticated connection to the simulation site and exposes a
//! single fetch operation to the layers above.
//!
//! ## Behaviour
//!
//! - Logs in lazily on the first fetch, or eagerly through
//!   [`ResourceFetcher::login`].
//! - When the upstream signals an expired session (401/403, or the login
//!   form served in place of the page) it logs in again once and retries
//!   that single fetch. A second expiry surfaces as
//!   [`LittlefieldError::Auth`].
//! - Concurrent re-logins are serialised; a caller that finds the session
//!   already renewed by someone else reuses it.
//! - A whole fetch, including any login or re-login it triggers, is bounded
//!   by the configured timeout. Each HTTP call carries the same limit and
//!   passes through the local request budget and the circuit breaker.
//!
//! No caching happens here; see [`crate::cache`].

use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::{Admission, CircuitBreaker};
use crate::config::{LittlefieldConfig, ResourcePaths};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::parse::RawPayload;
use crate::resource::Resource;
use crate::throttling::RequestBudget;
use crate::{Credentials, LittlefieldError};

/// Source of raw upstream pages.
///
/// The facade only talks to this trait, so tests can substitute a fake
/// that counts fetches or scripts failures.
pub trait ResourceFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        resource: Resource,
    ) -> Pin<Box<dyn Future<Output = Result<RawPayload, LittlefieldError>> + Send + 'a>>;

    /// Establishes a session ahead of the first fetch.
    fn login<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), LittlefieldError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    /// Ends the session; later fetches fail with [`LittlefieldError::SessionClosed`].
    fn close(&self) {}
}

/// Outcome of one authenticated page request.
enum Page {
    Body(String),
    LoginRequired,
}

/// Cookie-backed session against the simulation site.
pub struct HttpSession {
    http: Arc<dyn HttpClient>,
    credentials: Credentials,
    base_url: String,
    paths: ResourcePaths,
    login_form_marker: String,
    timeout: Duration,
    budget: Option<RequestBudget>,
    breaker: CircuitBreaker,
    /// Generation of the live session; zero means logged out.
    generation: AtomicU64,
    closed: AtomicBool,
    /// Serialises logins and counts them.
    logins: tokio::sync::Mutex<u64>,
}

impl HttpSession {
    pub fn new(config: &LittlefieldConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            credentials: config.credentials.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            paths: config.paths.clone(),
            login_form_marker: config.login_form_marker.clone(),
            timeout: config.fetch_timeout(),
            budget: config
                .requests_per_minute
                .and_then(NonZeroU32::new)
                .map(RequestBudget::per_minute),
            breaker: CircuitBreaker::new(config.breaker),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            logins: tokio::sync::Mutex::new(0),
        }
    }

    /// Session over a fresh reqwest client with its own cookie store.
    pub fn connect(config: &LittlefieldConfig) -> Result<Self, LittlefieldError> {
        let http = ReqwestHttpClient::new()
            .map_err(|error| LittlefieldError::transport(error.message().to_owned()))?;
        Ok(Self::new(config, Arc::new(http)))
    }

    pub fn is_logged_in(&self) -> bool {
        self.generation.load(Ordering::Acquire) != 0
    }

    /// Number of successful logins so far.
    pub async fn login_count(&self) -> u64 {
        *self.logins.lock().await
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn fetch_page(&self, resource: Resource) -> Result<RawPayload, LittlefieldError> {
        let generation = self.ensure_session().await?;

        match self.request_page(resource).await? {
            Page::Body(body) => Ok(RawPayload::new(body)),
            Page::LoginRequired => {
                tracing::warn!(%resource, "upstream session expired; logging in again");
                self.renew(generation).await?;
                match self.request_page(resource).await? {
                    Page::Body(body) => Ok(RawPayload::new(body)),
                    Page::LoginRequired => {
                        self.generation.store(0, Ordering::Release);
                        Err(LittlefieldError::auth(format!(
                            "session for team '{}' rejected again right after re-login",
                            self.credentials.team
                        )))
                    }
                }
            }
        }
    }

    async fn ensure_session(&self) -> Result<u64, LittlefieldError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LittlefieldError::SessionClosed);
        }
        match self.generation.load(Ordering::Acquire) {
            0 => self.renew(0).await,
            generation => Ok(generation),
        }
    }

    /// Logs in unless another caller already replaced session `stale`.
    async fn renew(&self, stale: u64) -> Result<u64, LittlefieldError> {
        let mut logins = self.logins.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(LittlefieldError::SessionClosed);
        }

        let current = self.generation.load(Ordering::Acquire);
        if current != 0 && current != stale {
            return Ok(current);
        }

        self.generation.store(0, Ordering::Release);
        self.perform_login().await?;

        *logins += 1;
        self.generation.store(*logins, Ordering::Release);
        Ok(*logins)
    }

    async fn perform_login(&self) -> Result<(), LittlefieldError> {
        let credentials = &self.credentials;
        let request = HttpRequest::post(self.url_for(&self.paths.login)).with_form(&[
            ("institution", credentials.institution.as_str()),
            ("ismobile", "false"),
            ("id", credentials.team.as_str()),
            ("password", credentials.password.as_str()),
        ]);

        let response = self.send(request).await?;
        if let Some(throttled) = throttled(&response) {
            return Err(throttled);
        }
        if matches!(response.status, 401 | 403) {
            return Err(LittlefieldError::auth(format!(
                "login for team '{}' rejected with status {}",
                credentials.team, response.status
            )));
        }
        if !response.is_success() {
            return Err(LittlefieldError::transport(format!(
                "login returned status {}",
                response.status
            )));
        }
        if response.body.contains(&self.login_form_marker) {
            return Err(LittlefieldError::auth(format!(
                "credentials rejected for team '{}' at '{}'",
                credentials.team, credentials.institution
            )));
        }

        tracing::info!(team = %credentials.team, "logged in to simulation");
        Ok(())
    }

    async fn request_page(&self, resource: Resource) -> Result<Page, LittlefieldError> {
        let url = self.url_for(&resource.path(&self.paths));
        tracing::debug!(%resource, %url, "fetching upstream page");

        let response = self.send(HttpRequest::get(url)).await?;
        if let Some(throttled) = throttled(&response) {
            return Err(throttled);
        }
        if matches!(response.status, 401 | 403) {
            return Ok(Page::LoginRequired);
        }
        if !response.is_success() {
            return Err(LittlefieldError::transport(format!(
                "{resource}: upstream returned status {}",
                response.status
            )));
        }
        if response.body.contains(&self.login_form_marker) {
            return Ok(Page::LoginRequired);
        }
        Ok(Page::Body(response.body))
    }

    /// Runs `operation` within the fetch timeout.
    async fn bounded<T>(
        &self,
        what: &str,
        operation: impl Future<Output = Result<T, LittlefieldError>>,
    ) -> Result<T, LittlefieldError> {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout_ms(),
                    "{what} did not complete in time"
                );
                Err(LittlefieldError::transport(format!(
                    "{what} did not complete within {} ms",
                    self.timeout_ms()
                )))
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Sends one request through the breaker, the budget and the timeout.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LittlefieldError> {
        let admission = self.breaker.admit();
        if !admission.is_allowed() {
            return Err(LittlefieldError::transport(
                "circuit breaker is open; skipping upstream call",
            ));
        }
        let _probe = ProbeGuard {
            breaker: &self.breaker,
            active: admission == Admission::Probe,
        };

        if let Some(budget) = &self.budget {
            if let Err(wait) = budget.acquire() {
                tracing::warn!(
                    wait_ms = wait.as_millis() as u64,
                    "local request budget exhausted"
                );
                return Err(LittlefieldError::rate_limited(
                    "local request budget exhausted",
                    Some(wait),
                ));
            }
        }

        let timeout_ms = self.timeout_ms();
        let request = request.with_timeout_ms(timeout_ms);

        let outcome = tokio::time::timeout(self.timeout, self.http.execute(request)).await;
        let response = match outcome {
            Err(_) => {
                self.breaker.record_failure();
                return Err(LittlefieldError::transport(format!(
                    "upstream did not answer within {timeout_ms} ms"
                )));
            }
            Ok(Err(error)) if error.timed_out() => {
                self.breaker.record_failure();
                return Err(LittlefieldError::transport(format!(
                    "upstream did not answer within {timeout_ms} ms: {error}"
                )));
            }
            Ok(Err(error)) => {
                self.breaker.record_failure();
                return Err(LittlefieldError::transport(format!(
                    "upstream request failed: {error}"
                )));
            }
            Ok(Ok(response)) => response,
        };

        if response.status >= 500 && throttled(&response).is_none() {
            self.breaker.record_failure();
        } else {
            self.breaker.record_success();
        }
        Ok(response)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Hands a half-open probe back to the breaker if its call never reported,
/// e.g. when the budget refused it or the fetch timed out mid-flight.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    active: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.breaker.abandon_probe();
        }
    }
}

/// Upstream throttling signal: 429, or 503 carrying `Retry-After`.
fn throttled(response: &HttpResponse) -> Option<LittlefieldError> {
    let retry_after = response.retry_after();
    let throttled = response.status == 429 || (response.status == 503 && retry_after.is_some());
    throttled.then(|| {
        LittlefieldError::rate_limited(
            format!("upstream returned status {}", response.status),
            retry_after,
        )
    })
}

impl ResourceFetcher for HttpSession {
    fn fetch<'a>(
        &'a self,
        resource: Resource,
    ) -> Pin<Box<dyn Future<Output = Result<RawPayload, LittlefieldError>> + Send + 'a>> {
        Box::pin(async move {
            let what = format!("fetch of {resource}");
            self.bounded(&what, self.fetch_page(resource)).await
        })
    }

    fn login<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), LittlefieldError>> + Send + 'a>> {
        Box::pin(async move {
            self.bounded("login", self.ensure_session())
                .await
                .map(|_| ())
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.generation.store(0, Ordering::Release);
        tracing::info!(team = %self.credentials.team, "session closed");
    }
}
