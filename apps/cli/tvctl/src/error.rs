use tv_core::error::CoreError;
use tv_core::error::config::ConfigError;
use tv_core::error::tv::TvError;

use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the command-line front end.
///
/// Core errors are flattened to their message so the whole enum stays
/// serializable; the location points at the CLI call site that gave up.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum TvctlError {
    /// Error from this app (logger, filesystem, runtime)
    #[error("Tvctl Error: {message} {location}")]
    Tvctl {
        message: String,
        location: ErrorLocation,
    },

    /// Error from tv-core operations
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// Config could not be loaded, validated or saved
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The TV never became ready for commands
    #[error("Not Ready Error: {message} {location}")]
    NotReady {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for TvctlError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Config(error) => TvctlError::from(error),
            error => TvctlError::Core {
                message: error.to_string(),
                location: ErrorLocation::caller(),
            },
        }
    }
}

impl From<TvError> for TvctlError {
    #[track_caller]
    fn from(error: TvError) -> Self {
        match error {
            TvError::Config(error) => TvctlError::from(error),
            TvError::Timeout { message, .. } => TvctlError::NotReady {
                message,
                location: ErrorLocation::caller(),
            },
            error => TvctlError::Core {
                message: error.to_string(),
                location: ErrorLocation::caller(),
            },
        }
    }
}

impl From<ConfigError> for TvctlError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        TvctlError::Config {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
