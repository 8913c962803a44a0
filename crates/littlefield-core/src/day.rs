//! Day-change detection over successive live-day readings.

use std::sync::Mutex;

use serde::Serialize;

/// Outcome of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum DayChange {
    /// Nothing was observed before.
    First { day: u32 },
    Unchanged { day: u32 },
    Advanced { from: u32, to: u32 },
    /// The upstream reported an earlier day than before. The stored day is
    /// kept.
    Regressed { from: u32, to: u32 },
}

impl DayChange {
    pub const fn is_advance(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }

    /// Day the detector holds after this observation.
    pub const fn current(&self) -> u32 {
        match *self {
            Self::First { day } | Self::Unchanged { day } => day,
            Self::Advanced { to, .. } => to,
            Self::Regressed { from, .. } => from,
        }
    }
}

/// Remembers the last observed simulation day.
///
/// Feed it [`crate::Littlefield::live_day`] readings; it reports whether the
/// simulation advanced. Shareable across tasks.
#[derive(Debug, Default)]
pub struct DayChangeDetector {
    last: Mutex<Option<u32>>,
}

impl DayChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a known day, e.g. one restored from a previous run.
    pub fn starting_at(day: u32) -> Self {
        Self {
            last: Mutex::new(Some(day)),
        }
    }

    pub fn last_day(&self) -> Option<u32> {
        *self.last.lock().expect("day detector lock is not poisoned")
    }

    pub fn observe(&self, day: u32) -> DayChange {
        let mut last = self.last.lock().expect("day detector lock is not poisoned");
        let change = match *last {
            None => DayChange::First { day },
            Some(previous) if previous == day => DayChange::Unchanged { day },
            Some(previous) if day > previous => DayChange::Advanced {
                from: previous,
                to: day,
            },
            Some(previous) => DayChange::Regressed {
                from: previous,
                to: day,
            },
        };

        match change {
            DayChange::First { .. } | DayChange::Advanced { .. } => *last = Some(day),
            DayChange::Regressed { from, to } => {
                tracing::warn!(from, to, "live day went backwards; keeping previous day");
            }
            DayChange::Unchanged { .. } => {}
        }
        if let DayChange::Advanced { from, to } = change {
            tracing::info!(from, to, "simulation day advanced");
        }
        change
    }

    pub fn reset(&self) {
        *self.last.lock().expect("day detector lock is not poisoned") = None;
    }
}
