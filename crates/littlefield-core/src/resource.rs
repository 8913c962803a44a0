//! Upstream resource identifiers.
//!
//! A [`Resource`] names one upstream feed. Its [`key`](Resource::key) is the
//! cache key, its [`class`](Resource::class) selects the cache TTL and its
//! [`shape`](Resource::shape) tells the parser what to produce.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::config::ResourcePaths;
use crate::{StationId, ValidationError};

/// Refresh cadence class of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Changes within a simulated day: cash, queues, utilization.
    Live,
    /// Changes rarely: materials policy, inventory, arrivals, lead times.
    Slow,
}

/// Structure a resource's payload normalizes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    DaySeries,
    Labeled,
    Materials,
}

impl PayloadShape {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DaySeries => "day series",
            Self::Labeled => "labeled series set",
            Self::Materials => "materials record",
        }
    }
}

/// A named upstream data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Cash,
    StationQueue(StationId),
    StationUtilization(StationId),
    Inventory,
    MaterialsInfo,
    JobArrivals,
    LeadTimes,
}

impl Resource {
    /// Every resource the facade can query.
    pub fn all() -> Vec<Resource> {
        let mut resources = vec![Self::Cash];
        for station in StationId::ALL {
            resources.push(Self::StationQueue(station));
            resources.push(Self::StationUtilization(station));
        }
        resources.extend([
            Self::Inventory,
            Self::MaterialsInfo,
            Self::JobArrivals,
            Self::LeadTimes,
        ]);
        resources
    }

    pub fn key(self) -> String {
        match self {
            Self::Cash => String::from("cash"),
            Self::StationQueue(station) => format!("station/{station}/queue"),
            Self::StationUtilization(station) => format!("station/{station}/utilization"),
            Self::Inventory => String::from("materials/inventory"),
            Self::MaterialsInfo => String::from("materials/info"),
            Self::JobArrivals => String::from("orders/arrivals"),
            Self::LeadTimes => String::from("jobs/leadtimes"),
        }
    }

    /// Inverse of [`Resource::key`].
    pub fn from_key(key: &str) -> Result<Self, ValidationError> {
        Self::all()
            .into_iter()
            .find(|resource| resource.key() == key)
            .ok_or_else(|| ValidationError::UnknownResource {
                key: key.to_owned(),
            })
    }

    pub const fn class(self) -> ResourceClass {
        match self {
            Self::Cash | Self::StationQueue(_) | Self::StationUtilization(_) => {
                ResourceClass::Live
            }
            Self::Inventory | Self::MaterialsInfo | Self::JobArrivals | Self::LeadTimes => {
                ResourceClass::Slow
            }
        }
    }

    pub const fn shape(self) -> PayloadShape {
        match self {
            Self::MaterialsInfo => PayloadShape::Materials,
            Self::LeadTimes => PayloadShape::Labeled,
            _ => PayloadShape::DaySeries,
        }
    }

    /// Upstream path for this resource, relative to the configured base url.
    pub fn path(self, paths: &ResourcePaths) -> String {
        match self {
            Self::Cash => paths.cash.clone(),
            Self::StationQueue(station) => station_path(&paths.station_queue, station),
            Self::StationUtilization(station) => {
                station_path(&paths.station_utilization, station)
            }
            Self::Inventory => paths.inventory.clone(),
            Self::MaterialsInfo => paths.materials.clone(),
            Self::JobArrivals => paths.job_arrivals.clone(),
            Self::LeadTimes => paths.lead_times.clone(),
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

fn station_path(template: &str, station: StationId) -> String {
    template.replace("{station}", &station.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_reversible() {
        let resources = Resource::all();
        assert_eq!(resources.len(), 11);
        for resource in resources {
            assert_eq!(Resource::from_key(&resource.key()), Ok(resource));
        }
    }

    #[test]
    fn unknown_key_is_a_validation_error() {
        assert_eq!(
            Resource::from_key("station/9/queue"),
            Err(ValidationError::UnknownResource {
                key: String::from("station/9/queue")
            })
        );
    }

    #[test]
    fn station_paths_substitute_the_ordinal() {
        let paths = ResourcePaths::default();
        let path = Resource::StationQueue(StationId::Two).path(&paths);
        assert!(path.contains("S2Q"), "unexpected path {path}");
        assert!(!path.contains("{station}"));
    }

    #[test]
    fn classes_split_live_from_slow_feeds() {
        assert_eq!(Resource::Cash.class(), ResourceClass::Live);
        assert_eq!(
            Resource::StationUtilization(StationId::One).class(),
            ResourceClass::Live
        );
        assert_eq!(Resource::MaterialsInfo.class(), ResourceClass::Slow);
        assert_eq!(Resource::LeadTimes.shape(), PayloadShape::Labeled);
    }
}
