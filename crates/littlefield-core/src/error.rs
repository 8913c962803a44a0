//! Error taxonomy for the acquisition core.
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`ValidationError`] | config, resources | Caller mistake detected before any I/O |
//! | [`ParseError`] | parser, facade | Upstream payload does not match the expected structure |
//! | [`LittlefieldError`] | every async operation | Top-level error handed back to callers |

use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

/// Validation errors for configuration and resource identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("station ordinal {ordinal} is out of range, expected 1, 2 or 3")]
    StationOutOfRange { ordinal: u8 },

    #[error("credential field '{field}' cannot be empty")]
    EmptyCredential { field: &'static str },

    #[error("base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },

    #[error("fetch timeout must be greater than zero")]
    ZeroTimeout,

    #[error("requests_per_minute must be greater than zero when set")]
    ZeroRequestBudget,

    #[error("unknown resource key '{key}'")]
    UnknownResource { key: String },

    #[error("path template '{template}' must contain '{{station}}'")]
    MissingStationPlaceholder { template: String },

    #[error("environment variable '{name}' is not set")]
    MissingEnv { name: &'static str },

    #[error("environment variable '{name}' is not a valid number: '{value}'")]
    InvalidEnvNumber { name: &'static str, value: String },

    #[error("config file error: {message}")]
    ConfigFile { message: String },
}

/// Structural problems found while normalizing an upstream payload.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("{resource}: day {day} appears twice with values {first} and {second}")]
    DuplicateDay {
        resource: String,
        day: u32,
        first: f64,
        second: f64,
    },

    #[error("{resource}: day marker '{token}' is not a non-negative whole number")]
    NonIntegralDay { resource: String, token: String },

    #[error("{resource}: value '{token}' for {field} is not numeric")]
    InvalidNumber {
        resource: String,
        field: String,
        token: String,
    },

    #[error("{resource}: point list has an odd number of tokens ({count})")]
    OddPointCount { resource: String, count: usize },

    #[error("{resource}: no series found in payload")]
    MissingSeries { resource: String },

    #[error("{resource}: unexpected payload structure: {detail}")]
    UnexpectedShape { resource: String, detail: String },

    #[error("{resource}: series is empty")]
    EmptySeries { resource: String },

    #[error("{resource}: cached payload is a {found}, expected a {expected}")]
    ShapeMismatch {
        resource: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Coarse classification used by callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    Transport,
    RateLimited,
    Parse,
    Validation,
    SessionClosed,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Transport => "transport",
            Self::RateLimited => "rate_limited",
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::SessionClosed => "session_closed",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error for every query and fetch.
///
/// `Clone` so that a single in-flight fetch can hand the same failure to
/// every caller waiting on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LittlefieldError {
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("upstream throttled the request: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("session has been closed")]
    SessionClosed,
}

impl LittlefieldError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::SessionClosed => ErrorKind::SessionClosed,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Auth => "upstream.auth",
            ErrorKind::Transport => "upstream.transport",
            ErrorKind::RateLimited => "upstream.rate_limited",
            ErrorKind::Parse => "payload.parse",
            ErrorKind::Validation => "request.validation",
            ErrorKind::SessionClosed => "session.closed",
        }
    }

    /// Whether a later poll has a reasonable chance of succeeding.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::RateLimited
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
