//! Errors raised by the application-channel connection manager.

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    /// No open socket to write to.
    #[error("Not Ready Error: {message} {location}")]
    NotReady {
        message: String,
        location: ErrorLocation,
    },

    /// The write did not finish within the internal send deadline.
    #[error("Send Timeout Error: {message} {location}")]
    SendTimeout {
        message: String,
        location: ErrorLocation,
    },

    /// The caller's cancellation token fired first.
    #[error("Cancelled Error: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Endpoint Error: {message} {location}")]
    Endpoint {
        message: String,
        location: ErrorLocation,
    },
}

impl From<url::ParseError> for ConnectionError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ConnectionError::Endpoint {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
