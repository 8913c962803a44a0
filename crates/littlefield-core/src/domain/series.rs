//! Day-indexed series and labeled series.
//!
//! A [`DaySeries`] is sorted by day and never holds two points for one day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// One observation of a metric on a simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayPoint {
    pub day: u32,
    pub value: f64,
}

impl DayPoint {
    pub const fn new(day: u32, value: f64) -> Self {
        Self { day, value }
    }
}

impl From<(u32, f64)> for DayPoint {
    fn from((day, value): (u32, f64)) -> Self {
        Self::new(day, value)
    }
}

/// Day-indexed series with strictly ascending, unique days.
///
/// The only way to build one is [`DaySeries::from_points`], which sorts the
/// input and rejects duplicate days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DaySeries {
    points: Vec<DayPoint>,
}

impl DaySeries {
    /// Sorts `points` by day and rejects any day that appears more than once.
    ///
    /// The sort is stable, so the reported `first`/`second` values of a
    /// duplicate follow upstream order.
    pub fn from_points(
        resource: &str,
        mut points: Vec<DayPoint>,
    ) -> Result<Self, ParseError> {
        points.sort_by_key(|point| point.day);

        if let Some(pair) = points.windows(2).find(|pair| pair[0].day == pair[1].day) {
            return Err(ParseError::DuplicateDay {
                resource: resource.to_owned(),
                day: pair[0].day,
                first: pair[0].value,
                second: pair[1].value,
            });
        }

        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[DayPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<DayPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent observation, if any.
    pub fn latest(&self) -> Option<DayPoint> {
        self.points.last().copied()
    }

    pub fn value_on(&self, day: u32) -> Option<f64> {
        self.points
            .binary_search_by_key(&day, |point| point.day)
            .ok()
            .map(|index| self.points[index].value)
    }

    /// Plain `(day, value)` pairs, the shape chart renderers consume.
    pub fn pairs(&self) -> Vec<(u32, f64)> {
        self.points
            .iter()
            .map(|point| (point.day, point.value))
            .collect()
    }
}

/// Series for one contract in the lead-time report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSeries {
    pub contract_id: String,
    /// Additional attributes the upstream attaches to the series (colour, units).
    pub metadata: BTreeMap<String, String>,
    pub series: DaySeries,
}

impl LabeledSeries {
    pub fn new(
        contract_id: impl Into<String>,
        metadata: BTreeMap<String, String>,
        series: DaySeries,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            metadata,
            series,
        }
    }
}
