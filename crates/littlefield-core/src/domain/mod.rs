//! # Domain Models
//!
//! Typed values handed back to callers of the factory facade.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DayPoint`] | `(day, value)` observation |
//! | [`DaySeries`] | Ordered, duplicate-free day series |
//! | [`LabeledSeries`] | Per-contract series for lead-time reporting |
//! | [`MaterialsInfo`] | Raw materials ordering state, all fields optional |
//! | [`StationId`] | One of the three fixed stations |
//!
//! `DaySeries` enforces its ordering invariant at construction, in the
//! same way the parser surfaces structural problems: as a [`ParseError`](crate::ParseError).

mod materials;
mod series;
mod station;

pub use materials::MaterialsInfo;
pub use series::{DayPoint, DaySeries, LabeledSeries};
pub use station::StationId;
