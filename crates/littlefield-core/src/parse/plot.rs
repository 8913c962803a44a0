//! Plot page extraction.
//!
//! The simulation serves charts as HTML pages carrying their data either as
//! script objects
//!
//! ```text
//! {label: 'contract 1', points: '1 0.52 2 0.61 3 0.58', color: '#0000ff'}
//! ```
//!
//! or, on older pages, as applet parameters
//!
//! ```text
//! <param name="data" value="1 1000 2 1050 3 1200">
//! ```
//!
//! Points are whitespace-separated `day value` pairs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::{DayPoint, DaySeries, LabeledSeries, ParseError};

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{[^{}]*\bpoints\s*:\s*['"][^'"]*['"][^{}]*\}"#)
        .expect("script block pattern compiles")
});

static BLOCK_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*:\s*['"]([^'"]*)['"]"#).expect("block field pattern compiles")
});

static APPLET_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<param\s+name\s*=\s*["']?(data\d*)["']?\s+value\s*=\s*["']([^"']*)["']"#)
        .expect("applet param pattern compiles")
});

/// One series as found on the page, before point normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawSeries {
    pub label: String,
    pub metadata: BTreeMap<String, String>,
    pub points: String,
}

/// Finds every series on a plot page, script blocks first.
pub(crate) fn extract_series(body: &str) -> Vec<RawSeries> {
    let scripted: Vec<RawSeries> = SCRIPT_BLOCK
        .find_iter(body)
        .enumerate()
        .map(|(index, block)| {
            let mut label = None;
            let mut points = String::new();
            let mut metadata = BTreeMap::new();
            for field in BLOCK_FIELD.captures_iter(block.as_str()) {
                let value = field[2].trim().to_owned();
                match &field[1] {
                    "label" => label = Some(value),
                    "points" => points = value,
                    other => {
                        metadata.insert(other.to_owned(), value);
                    }
                }
            }
            RawSeries {
                label: label.unwrap_or_else(|| format!("series {}", index + 1)),
                metadata,
                points,
            }
        })
        .collect();

    if !scripted.is_empty() {
        return scripted;
    }

    APPLET_PARAM
        .captures_iter(body)
        .map(|param| RawSeries {
            label: param[1].to_owned(),
            metadata: BTreeMap::new(),
            points: param[2].trim().to_owned(),
        })
        .collect()
}

/// Normalizes a single-series plot page.
pub(crate) fn parse_day_series(resource: &str, body: &str) -> Result<DaySeries, ParseError> {
    let mut series = extract_series(body);
    match series.len() {
        0 => Err(ParseError::MissingSeries {
            resource: resource.to_owned(),
        }),
        1 => {
            let raw = series.remove(0);
            DaySeries::from_points(resource, parse_points(resource, &raw.points)?)
        }
        found => Err(ParseError::UnexpectedShape {
            resource: resource.to_owned(),
            detail: format!("expected one series, found {found}"),
        }),
    }
}

/// Normalizes a multi-contract plot page.
///
/// Blocks sharing a label are merged into one contract before sorting, so
/// a contract split across blocks still yields one ordered series.
pub(crate) fn parse_labeled_series(
    resource: &str,
    body: &str,
) -> Result<Vec<LabeledSeries>, ParseError> {
    let raw = extract_series(body);
    if raw.is_empty() {
        return Err(ParseError::MissingSeries {
            resource: resource.to_owned(),
        });
    }

    let mut order: Vec<String> = Vec::new();
    let mut grouped: BTreeMap<String, (BTreeMap<String, String>, Vec<DayPoint>)> =
        BTreeMap::new();

    for series in raw {
        let points = parse_points(resource, &series.points)?;
        let entry = grouped.entry(series.label.clone()).or_insert_with(|| {
            order.push(series.label.clone());
            (BTreeMap::new(), Vec::new())
        });
        for (key, value) in series.metadata {
            entry.0.entry(key).or_insert(value);
        }
        entry.1.extend(points);
    }

    order
        .into_iter()
        .filter_map(|label| grouped.remove(&label).map(|group| (label, group)))
        .map(|(label, (metadata, points))| {
            let scope = format!("{resource}[{label}]");
            DaySeries::from_points(&scope, points)
                .map(|series| LabeledSeries::new(label, metadata, series))
        })
        .collect()
}

/// Splits a point list into day/value pairs.
///
/// Rows whose day marker is not a number are dropped. A numeric day that is
/// negative or fractional, or a value that is not a number, fails the parse.
pub(crate) fn parse_points(resource: &str, raw: &str) -> Result<Vec<DayPoint>, ParseError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(ParseError::OddPointCount {
            resource: resource.to_owned(),
            count: tokens.len(),
        });
    }

    let mut points = Vec::with_capacity(tokens.len() / 2);
    for pair in tokens.chunks_exact(2) {
        let (day_token, value_token) = (pair[0], pair[1]);

        let Some(day) = super::parse_number(day_token) else {
            tracing::debug!(resource, token = day_token, "dropping row with non-numeric day");
            continue;
        };
        let day = whole_day(resource, day_token, day)?;

        let value = super::parse_number(value_token).ok_or_else(|| ParseError::InvalidNumber {
            resource: resource.to_owned(),
            field: format!("day {day}"),
            token: value_token.to_owned(),
        })?;

        points.push(DayPoint::new(day, value));
    }
    Ok(points)
}

pub(crate) fn whole_day(resource: &str, token: &str, day: f64) -> Result<u32, ParseError> {
    if day < 0.0 || day.fract() != 0.0 || day > f64::from(u32::MAX) {
        return Err(ParseError::NonIntegralDay {
            resource: resource.to_owned(),
            token: token.to_owned(),
        });
    }
    Ok(day as u32)
}
