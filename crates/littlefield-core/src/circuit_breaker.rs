//! Consecutive-failure circuit breaker guarding the simulation site.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::BreakerConfig;

/// Breaker state for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Outcome of asking the breaker for permission to call upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// The single trial call of a half-open breaker. Its holder must report
    /// an outcome or call [`CircuitBreaker::abandon_probe`].
    Probe,
    Rejected,
}

impl Admission {
    pub const fn is_allowed(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Stops hammering an upstream that keeps failing at the transport level.
///
/// Only transport failures count. Authentication, throttling and parse
/// failures mean the upstream answered, so they leave the breaker alone.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_timeout: Duration,
    inner: Mutex<BreakerState>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            open_timeout: config.open_timeout(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Whether a request may go upstream now. Once the open timeout has
    /// elapsed, exactly one caller is admitted as a probe; everyone else is
    /// rejected until that probe reports back.
    pub fn admit(&self) -> Admission {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::HalfOpen if inner.probe_in_flight => Admission::Rejected,
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                Admission::Probe
            }
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .is_some_and(|opened_at| opened_at.elapsed() >= self.open_timeout);
                if !elapsed {
                    return Admission::Rejected;
                }
                inner.state = CircuitState::HalfOpen;
                inner.opened_at = None;
                inner.probe_in_flight = true;
                Admission::Probe
            }
        }
    }

    pub fn allow_request(&self) -> bool {
        self.admit().is_allowed()
    }

    /// Releases a probe that ended without an outcome, e.g. a cancelled call.
    pub fn abandon_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!("upstream recovered; closing circuit breaker");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let trip = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.failure_threshold;
        if trip && inner.state != CircuitState::Open {
            tracing::warn!(
                failures = inner.consecutive_failures,
                open_ms = self.open_timeout.as_millis() as u64,
                "opening circuit breaker after upstream transport failures"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
        inner.probe_in_flight = false;
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
    }
}
