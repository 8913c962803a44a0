//! Configuration consumed by the session and the cache.
//!
//! Configuration is loaded once at startup, either from environment
//! variables or from a JSON file, and validated before the facade is built.
//!
//! | Variable | Required | Field |
//! |----------|----------|-------|
//! | `LITTLEFIELD_TEAM` | yes | `credentials.team` |
//! | `LITTLEFIELD_PASSWORD` | yes | `credentials.password` |
//! | `LITTLEFIELD_INSTITUTION` | yes | `credentials.institution` |
//! | `LITTLEFIELD_BASE_URL` | no | `base_url` |
//! | `LITTLEFIELD_TIMEOUT_MS` | no | `fetch_timeout_ms` |

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resource::{Resource, ResourceClass};
use crate::ValidationError;

pub const DEFAULT_BASE_URL: &str = "http://op.responsive.net";
pub const DEFAULT_LOGIN_FORM_MARKER: &str = "name=\"password\"";

/// Team login for the simulation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub team: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub institution: String,
}

impl Credentials {
    pub fn new(
        team: impl Into<String>,
        password: impl Into<String>,
        institution: impl Into<String>,
    ) -> Self {
        Self {
            team: team.into(),
            password: password.into(),
            institution: institution.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.team.trim().is_empty() {
            return Err(ValidationError::EmptyCredential { field: "team" });
        }
        if self.password.is_empty() {
            return Err(ValidationError::EmptyCredential { field: "password" });
        }
        if self.institution.trim().is_empty() {
            return Err(ValidationError::EmptyCredential {
                field: "institution",
            });
        }
        Ok(())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("team", &self.team)
            .field("password", &"<redacted>")
            .field("institution", &self.institution)
            .finish()
    }
}

/// Upstream paths, relative to `base_url`.
///
/// Station paths are templates; `{station}` is replaced by the ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePaths {
    pub login: String,
    pub cash: String,
    pub station_queue: String,
    pub station_utilization: String,
    pub inventory: String,
    pub materials: String,
    pub job_arrivals: String,
    pub lead_times: String,
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self {
            login: String::from("/Littlefield/CheckAccess"),
            cash: String::from("/Littlefield/Plot?data=CASH&x=all"),
            station_queue: String::from("/Littlefield/Plot?data=S{station}Q&x=all"),
            station_utilization: String::from("/Littlefield/Plot?data=S{station}UTIL&x=all"),
            inventory: String::from("/Littlefield/Plot?data=INV&x=all"),
            materials: String::from("/Littlefield/Material"),
            job_arrivals: String::from("/Littlefield/Plot?data=JOBIN&x=all"),
            lead_times: String::from("/Littlefield/Plot?data=JOBT&x=all"),
        }
    }
}

/// Freshness window plus the extra time a snapshot stays servable when a
/// refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtl {
    #[serde(rename = "fresh_ms", with = "duration_ms")]
    pub fresh: Duration,
    #[serde(rename = "stale_grace_ms", with = "duration_ms")]
    pub stale_grace: Duration,
}

impl CacheTtl {
    pub const fn new(fresh: Duration, stale_grace: Duration) -> Self {
        Self { fresh, stale_grace }
    }

    /// Oldest age at which a snapshot may still be served after a failed fetch.
    pub fn max_age(&self) -> Duration {
        self.fresh.saturating_add(self.stale_grace)
    }
}

/// TTLs per resource class with optional per-resource overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    pub live: CacheTtl,
    pub slow: CacheTtl,
    /// Keyed by [`Resource::key`].
    pub overrides: BTreeMap<String, CacheTtl>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            live: CacheTtl::new(Duration::from_secs(20), Duration::from_secs(120)),
            slow: CacheTtl::new(Duration::from_secs(60), Duration::from_secs(300)),
            overrides: BTreeMap::new(),
        }
    }
}

impl TtlPolicy {
    pub fn for_resource(&self, resource: Resource) -> CacheTtl {
        if let Some(ttl) = self.overrides.get(&resource.key()) {
            return *ttl;
        }
        match resource.class() {
            ResourceClass::Live => self.live,
            ResourceClass::Slow => self.slow,
        }
    }

    pub fn with_override(mut self, resource: Resource, ttl: CacheTtl) -> Self {
        self.overrides.insert(resource.key(), ttl);
        self
    }
}

/// Consecutive-failure breaker protecting the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub open_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_ms: 30_000,
        }
    }
}

impl BreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_ms)
    }
}

/// Full configuration for one team's live data feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LittlefieldConfig {
    pub credentials: Credentials,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub paths: ResourcePaths,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Local budget of upstream requests per minute; `None` disables it.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: Option<u32>,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default = "default_login_form_marker")]
    pub login_form_marker: String,
    #[serde(default)]
    pub ttl: TtlPolicy,
}

fn default_base_url() -> String {
    String::from(DEFAULT_BASE_URL)
}

const fn default_fetch_timeout_ms() -> u64 {
    10_000
}

const fn default_requests_per_minute() -> Option<u32> {
    Some(60)
}

fn default_login_form_marker() -> String {
    String::from(DEFAULT_LOGIN_FORM_MARKER)
}

impl LittlefieldConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: default_base_url(),
            paths: ResourcePaths::default(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            requests_per_minute: default_requests_per_minute(),
            breaker: BreakerConfig::default(),
            login_form_marker: default_login_form_marker(),
            ttl: TtlPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; [`from_env`](Self::from_env)
    /// passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name).ok_or(ValidationError::MissingEnv { name })
        };

        let credentials = Credentials::new(
            required("LITTLEFIELD_TEAM")?,
            required("LITTLEFIELD_PASSWORD")?,
            required("LITTLEFIELD_INSTITUTION")?,
        );
        let mut config = Self::new(credentials);

        if let Some(base_url) = lookup("LITTLEFIELD_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup("LITTLEFIELD_TIMEOUT_MS") {
            config.fetch_timeout_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ValidationError::InvalidEnvNumber {
                        name: "LITTLEFIELD_TIMEOUT_MS",
                        value: raw.clone(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(raw).map_err(|error| {
            ValidationError::ConfigFile {
                message: error.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| ValidationError::ConfigFile {
            message: format!("{}: {error}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.credentials.validate()?;

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl {
                value: self.base_url.clone(),
            });
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if self.requests_per_minute == Some(0) {
            return Err(ValidationError::ZeroRequestBudget);
        }
        for template in [&self.paths.station_queue, &self.paths.station_utilization] {
            if !template.contains("{station}") {
                return Err(ValidationError::MissingStationPlaceholder {
                    template: template.clone(),
                });
            }
        }
        for key in self.ttl.overrides.keys() {
            Resource::from_key(key)?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
