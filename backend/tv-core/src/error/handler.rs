//! Failure type returned by event subscribers and response callbacks.
//!
//! Subscribers run on dispatch tasks where nobody awaits their result, so the
//! only thing that happens to a [`HandlerError`] is that it gets logged. The
//! conversions below let callbacks use `?` on any core operation.

use crate::error::config::ConfigError;
use crate::error::connection::ConnectionError;
use crate::error::ip_control::IpControlError;
use crate::error::protocol::ProtocolError;
use crate::error::rs232::Rs232Error;
use crate::error::tv::TvError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum HandlerError {
    #[error("Handler Failed Error: {message} {location}")]
    Failed {
        message: String,
        location: ErrorLocation,
    },
}

impl HandlerError {
    #[track_caller]
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<ConnectionError> for HandlerError {
    #[track_caller]
    fn from(error: ConnectionError) -> Self {
        HandlerError::failed(error.to_string())
    }
}

impl From<ProtocolError> for HandlerError {
    #[track_caller]
    fn from(error: ProtocolError) -> Self {
        HandlerError::failed(error.to_string())
    }
}

impl From<IpControlError> for HandlerError {
    #[track_caller]
    fn from(error: IpControlError) -> Self {
        HandlerError::failed(error.to_string())
    }
}

impl From<Rs232Error> for HandlerError {
    #[track_caller]
    fn from(error: Rs232Error) -> Self {
        HandlerError::failed(error.to_string())
    }
}

impl From<TvError> for HandlerError {
    #[track_caller]
    fn from(error: TvError) -> Self {
        HandlerError::failed(error.to_string())
    }
}

impl From<ConfigError> for HandlerError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        HandlerError::failed(error.to_string())
    }
}
