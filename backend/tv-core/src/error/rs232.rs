use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Rs232Error {
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

    #[error("Cancelled Error: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for Rs232Error {
    #[track_caller]
    fn from(error: IoError) -> Self {
        Rs232Error::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
