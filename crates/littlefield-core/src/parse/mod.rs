//! # Series Parser
//!
//! Turns raw upstream pages into typed values. Parsing is synchronous and
//! never does I/O.
//!
//! | Resource shape | Output |
//! |----------------|--------|
//! | Day series (cash, queues, utilization, inventory, arrivals) | [`DaySeries`] |
//! | Labeled (lead times) | `Vec<`[`LabeledSeries`]`>` grouped by contract |
//! | Materials | [`MaterialsInfo`] |
//!
//! Structural surprises are reported as [`ParseError`], never papered over
//! with a partial result.

mod materials;
mod plot;

use serde::Serialize;

use crate::resource::{PayloadShape, Resource};
use crate::{DaySeries, LabeledSeries, MaterialsInfo, ParseError};

/// Unparsed page body as returned by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub body: String,
}

impl RawPayload {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Parsed form of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedPayload {
    Series(DaySeries),
    Labeled(Vec<LabeledSeries>),
    Materials(MaterialsInfo),
}

impl ParsedPayload {
    pub const fn shape(&self) -> PayloadShape {
        match self {
            Self::Series(_) => PayloadShape::DaySeries,
            Self::Labeled(_) => PayloadShape::Labeled,
            Self::Materials(_) => PayloadShape::Materials,
        }
    }
}

/// Parses `payload` into the shape `resource` declares.
pub fn parse(resource: Resource, payload: &RawPayload) -> Result<ParsedPayload, ParseError> {
    let key = resource.key();
    match resource.shape() {
        PayloadShape::DaySeries => {
            plot::parse_day_series(&key, &payload.body).map(ParsedPayload::Series)
        }
        PayloadShape::Labeled => {
            plot::parse_labeled_series(&key, &payload.body).map(ParsedPayload::Labeled)
        }
        PayloadShape::Materials => {
            materials::parse_materials(&key, &payload.body).map(ParsedPayload::Materials)
        }
    }
}

/// Coerces an upstream number, allowing thousands separators.
pub(crate) fn parse_number(token: &str) -> Option<f64> {
    let cleaned: String = token.chars().filter(|ch| *ch != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
