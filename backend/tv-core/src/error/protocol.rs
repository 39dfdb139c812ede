//! Errors raised by the request/subscription multiplexer.

use crate::error::connection::ConnectionError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Not Ready Error: {message} {location}")]
    NotReady {
        message: String,
        location: ErrorLocation,
    },

    #[error("Already Connected Error: {message} {location}")]
    AlreadyConnected {
        message: String,
        location: ErrorLocation,
    },

    /// The per-session correlation id space is used up.
    #[error("Id Space Exhausted Error: {issued} ids issued this session {location}")]
    IdSpaceExhausted { issued: u32, location: ErrorLocation },

    /// Envelope could not be encoded, or an inbound message is not an envelope.
    #[error("JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },

    /// A response referenced an id with no pending entry.
    #[error("Unknown Correlation Error: {id} {location}")]
    UnknownCorrelation { id: String, location: ErrorLocation },

    /// The device answered with an `error` envelope.
    #[error("Remote Error: {message} {location}")]
    Remote {
        message: String,
        location: ErrorLocation,
    },

    /// The pending entry was discarded (session reset) before a response arrived.
    #[error("Session Reset Error: {message} {location}")]
    SessionReset {
        message: String,
        location: ErrorLocation,
    },

    #[error("Cancelled Error: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },

    /// The response payload did not match the shape the subscriber expects.
    #[error("Payload Shape Error: {message} {location}")]
    PayloadShape {
        message: String,
        location: ErrorLocation,
    },

    /// A subscriber callback failed.
    #[error("Handler Error: {message} {location}")]
    Handler {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::Json {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
