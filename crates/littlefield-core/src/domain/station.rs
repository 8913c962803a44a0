//! The three processing stations.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One of the three processing stations of the simulated factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StationId {
    One,
    Two,
    Three,
}

impl StationId {
    pub const ALL: [StationId; 3] = [Self::One, Self::Two, Self::Three];

    pub const fn ordinal(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl TryFrom<u8> for StationId {
    type Error = ValidationError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        match ordinal {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            _ => Err(ValidationError::StationOutOfRange { ordinal }),
        }
    }
}

impl From<StationId> for u8 {
    fn from(value: StationId) -> Self {
        value.ordinal()
    }
}

impl Display for StationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ordinal())
    }
}
