//! Local request budget backed by a `governor` rate limiter.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Local budget of upstream requests.
///
/// The budget refills evenly across the minute and allows the whole
/// per-minute allowance as a burst, so a cold start can fetch every
/// resource at once.
#[derive(Clone)]
pub struct RequestBudget {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl RequestBudget {
    pub fn per_minute(limit: NonZeroU32) -> Self {
        Self::new(Duration::from_secs(60), limit)
    }

    pub fn new(window: Duration, limit: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
            clock: DefaultClock::default(),
        }
    }

    /// Takes one request from the budget, or returns how long until one is available.
    pub fn acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }
}

fn quota_from_window(window: Duration, limit: NonZeroU32) -> Quota {
    let per_cell = (window.as_secs_f64() / f64::from(limit.get())).max(0.001);
    Quota::with_period(Duration::from_secs_f64(per_cell))
        .unwrap_or_else(|| Quota::per_second(limit))
        .allow_burst(limit)
}
