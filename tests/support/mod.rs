//! Fakes shared by the behavior tests.
//!
//! - [`ScriptedFetcher`] stands in for the session and counts fetches.
//! - [`FakeSite`] stands in for the simulation web site behind the session.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use littlefield_core::{
    Credentials, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, LittlefieldConfig,
    LittlefieldError, RawPayload, Resource, ResourceFetcher,
};

pub const LOGIN_FORM: &str =
    r#"<form action="/Littlefield/CheckAccess"><input type="password" name="password"></form>"#;

/// Builds a plot page holding one unlabeled series.
pub fn plot_page(points: &[(u32, f64)]) -> String {
    let points = points
        .iter()
        .map(|(day, value)| format!("{day} {value}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("<html><script>chart.add({{points: '{points}'}});</script></html>")
}

/// Fetcher answering from per-resource scripts.
///
/// Scripted outcomes are consumed in order; once a resource's script is
/// empty its default body is served.
pub struct ScriptedFetcher {
    defaults: Mutex<HashMap<Resource, String>>,
    scripts: Mutex<HashMap<Resource, VecDeque<Result<String, LittlefieldError>>>>,
    fetches: Mutex<HashMap<Resource, usize>>,
    latency: Duration,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            defaults: Mutex::new(HashMap::new()),
            scripts: Mutex::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
            latency,
        }
    }

    pub fn serve(self, resource: Resource, body: impl Into<String>) -> Self {
        self.set_default(resource, body);
        self
    }

    pub fn set_default(&self, resource: Resource, body: impl Into<String>) {
        self.defaults
            .lock()
            .expect("defaults lock")
            .insert(resource, body.into());
    }

    pub fn push(&self, resource: Resource, outcome: Result<String, LittlefieldError>) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .entry(resource)
            .or_default()
            .push_back(outcome);
    }

    pub fn fetches(&self, resource: Resource) -> usize {
        self.fetches
            .lock()
            .expect("fetches lock")
            .get(&resource)
            .copied()
            .unwrap_or(0)
    }

    fn next(&self, resource: Resource) -> Result<RawPayload, LittlefieldError> {
        *self
            .fetches
            .lock()
            .expect("fetches lock")
            .entry(resource)
            .or_default() += 1;

        let scripted = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get_mut(&resource)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(outcome) => outcome.map(RawPayload::new),
            None => self
                .defaults
                .lock()
                .expect("defaults lock")
                .get(&resource)
                .cloned()
                .map(RawPayload::new)
                .ok_or_else(|| LittlefieldError::transport(format!("{resource}: not scripted"))),
        }
    }
}

impl ResourceFetcher for ScriptedFetcher {
    fn fetch<'a>(
        &'a self,
        resource: Resource,
    ) -> Pin<Box<dyn Future<Output = Result<RawPayload, LittlefieldError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.next(resource)
        })
    }
}

/// In-memory simulation site with a single cookie session.
pub struct FakeSite {
    pages: Mutex<HashMap<String, String>>,
    logged_in: AtomicBool,
    logins: AtomicUsize,
    page_requests: AtomicUsize,
    /// Upcoming page requests answered with the login form.
    forced_expiries: AtomicUsize,
    reject_logins: AtomicBool,
    page_override: Mutex<Option<HttpResponse>>,
    page_delay: Mutex<Duration>,
}

pub const BASE_URL: &str = "https://sim.test";

impl FakeSite {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            logged_in: AtomicBool::new(false),
            logins: AtomicUsize::new(0),
            page_requests: AtomicUsize::new(0),
            forced_expiries: AtomicUsize::new(0),
            reject_logins: AtomicBool::new(false),
            page_override: Mutex::new(None),
            page_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Serves `body` at `path`, e.g. `/Littlefield/Plot?data=CASH&x=all`.
    pub fn page(self, path: &str, body: impl Into<String>) -> Self {
        self.pages
            .lock()
            .expect("pages lock")
            .insert(format!("{BASE_URL}{path}"), body.into());
        self
    }

    pub fn expire_session(&self) {
        self.logged_in.store(false, Ordering::SeqCst);
    }

    pub fn force_expiries(&self, count: usize) {
        self.forced_expiries.store(count, Ordering::SeqCst);
    }

    pub fn reject_logins(&self) {
        self.reject_logins.store(true, Ordering::SeqCst);
    }

    pub fn answer_pages_with(&self, response: HttpResponse) {
        *self.page_override.lock().expect("override lock") = Some(response);
    }

    pub fn delay_pages(&self, delay: Duration) {
        *self.page_delay.lock().expect("delay lock") = delay;
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    fn answer_login(&self) -> HttpResponse {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.reject_logins.load(Ordering::SeqCst) {
            return HttpResponse::ok(LOGIN_FORM);
        }
        self.logged_in.store(true, Ordering::SeqCst);
        HttpResponse::ok("<html>Welcome to Littlefield</html>")
    }

    fn answer_page(&self, url: &str) -> HttpResponse {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.page_override.lock().expect("override lock").clone() {
            return response;
        }
        let forced = self
            .forced_expiries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if forced {
            self.logged_in.store(false, Ordering::SeqCst);
        }
        if !self.logged_in.load(Ordering::SeqCst) {
            return HttpResponse::ok(LOGIN_FORM);
        }
        match self.pages.lock().expect("pages lock").get(url) {
            Some(body) => HttpResponse::ok(body.clone()),
            None => HttpResponse::new(404, "not found"),
        }
    }
}

impl HttpClient for FakeSite {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            if request.method == HttpMethod::Post {
                return Ok(self.answer_login());
            }
            let delay = *self.page_delay.lock().expect("delay lock");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(self.answer_page(&request.url))
        })
    }
}

pub fn site_config() -> LittlefieldConfig {
    let mut config = LittlefieldConfig::new(Credentials::new("team7", "s3cret", "uni"));
    config.base_url = String::from(BASE_URL);
    config
}
