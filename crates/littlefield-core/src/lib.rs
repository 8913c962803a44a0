//! # Littlefield Core
//!
//! Live data acquisition for a Littlefield factory simulation team.
//!
//! ## Overview
//!
//! The simulation site only offers an interactive web UI. This crate logs in
//! as a team, fetches the plot and status pages, and turns them into typed
//! day-indexed series:
//!
//! - **Session management** with one transparent re-login on expiry
//! - **Series parsing** of plot pages and the materials page
//! - **Snapshot caching** with per-resource single-flight fetches
//! - **Factory facade** exposing one query per business metric
//! - **Day-change detection** over successive live-day readings
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Snapshot cache with single-flight and stale fallback |
//! | [`circuit_breaker`] | Circuit breaker for upstream failures |
//! | [`config`] | Credentials, TTLs and endpoint paths |
//! | [`day`] | Day-change detector |
//! | [`domain`] | Day series, labeled series, materials, stations |
//! | [`error`] | Error taxonomy |
//! | [`factory`] | [`Littlefield`] facade |
//! | [`http_client`] | HTTP client abstraction |
//! | [`parse`] | Page parsers |
//! | [`resource`] | Upstream resource catalog |
//! | [`session`] | Authenticated session and the fetcher trait |
//! | [`throttling`] | Local request budget |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use littlefield_core::{DayChangeDetector, Littlefield, LittlefieldConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LittlefieldConfig::from_env()?;
//!     let factory = Littlefield::connect(&config)?;
//!     let detector = DayChangeDetector::new();
//!
//!     let day = factory.live_day().await?;
//!     if detector.observe(day).is_advance() {
//!         let queue = factory.station(1)?.queue_size().await?;
//!         println!("day {day}: station 1 queue {:?}", queue.latest());
//!     }
//!
//!     factory.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Littlefield     │────▶│ Snapshot Cache   │
//! │ (facade)        │     │ (single-flight)  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Session         │────▶│ Budget / Breaker │
//! │ (fetcher trait) │     └──────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ HTTP Client     │     │ Parsers          │
//! │ (reqwest)       │     │ (regex)          │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`LittlefieldError`], whose stable code names the
//! failure class:
//!
//! ```rust
//! use littlefield_core::{ErrorKind, LittlefieldError};
//!
//! fn handle_error(error: LittlefieldError) {
//!     match error.kind() {
//!         ErrorKind::RateLimited => {
//!             // Back off for error.retry_after()
//!         }
//!         ErrorKind::Auth => {
//!             // Check credentials
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The team password is never logged and never serialized
//! - Credentials come from the environment or a config file only

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod day;
pub mod domain;
pub mod error;
pub mod factory;
pub mod http_client;
pub mod parse;
pub mod resource;
pub mod session;
pub mod throttling;

// Caching
pub use cache::{CacheMode, Snapshot, SnapshotCache};

// Circuit breaker
pub use circuit_breaker::{Admission, CircuitBreaker, CircuitState};

// Configuration
pub use config::{BreakerConfig, CacheTtl, Credentials, LittlefieldConfig, ResourcePaths, TtlPolicy};

// Day-change detection
pub use day::{DayChange, DayChangeDetector};

// Domain models
pub use domain::{DayPoint, DaySeries, LabeledSeries, MaterialsInfo, StationId};

// Error types
pub use error::{ErrorKind, LittlefieldError, ParseError, ValidationError};

// Facade
pub use factory::{CompletedJobs, Littlefield, Materials, Orders, Station};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Parsing
pub use parse::{parse, ParsedPayload, RawPayload};

// Resources
pub use resource::{PayloadShape, Resource, ResourceClass};

// Session
pub use session::{HttpSession, ResourceFetcher};

// Throttling
pub use throttling::RequestBudget;
