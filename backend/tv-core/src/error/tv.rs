//! Errors raised by the device-level orchestrator.

use crate::error::config::ConfigError;
use crate::error::ip_control::IpControlError;
use crate::error::protocol::ProtocolError;
use crate::error::rs232::Rs232Error;

use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TvError {
    /// The TV is not paired/ready for the requested operation.
    #[error("Not Ready Error: {message} {location}")]
    NotReady {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid MAC Address Error: {message} {location}")]
    InvalidMacAddress {
        message: String,
        location: ErrorLocation,
    },

    /// The operation needs a side channel that is disabled in the options.
    #[error("Channel Disabled Error: {message} {location}")]
    ChannelDisabled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Cancelled Error: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    IpControl(#[from] IpControlError),

    #[error(transparent)]
    Rs232(#[from] Rs232Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<IoError> for TvError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        TvError::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
