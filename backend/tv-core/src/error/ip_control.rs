use crate::error::cipher::CipherError;

use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IpControlError {
    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    /// The peer closed the connection (zero-byte read).
    #[error("Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Cancelled Error: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl From<IoError> for IpControlError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        IpControlError::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
