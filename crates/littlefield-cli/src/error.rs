use littlefield_core::{ErrorKind, LittlefieldError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(ValidationError),

    #[error(transparent)]
    Upstream(#[from] LittlefieldError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        Self::Upstream(LittlefieldError::Validation(error))
    }
}

impl CliError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config.invalid",
            Self::Upstream(error) => error.code(),
            Self::Serialization(_) => "output.serialization",
            Self::Io(_) => "output.io",
        }
    }

    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Upstream(error) => match error.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::Parse => 4,
                ErrorKind::Auth => 5,
                ErrorKind::RateLimited => 6,
                ErrorKind::Transport | ErrorKind::SessionClosed => 7,
            },
            Self::Config(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
