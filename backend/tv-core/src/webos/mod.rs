//! Client for the TV's WebSocket application channel.

pub mod client;
pub mod connection;
pub mod envelope;
pub mod state;

pub(crate) mod correlation;
pub(crate) mod pairing;
pub(crate) mod subscription;

pub use client::WebOsClient;
pub use connection::WebOsConnection;
pub use envelope::{Envelope, EnvelopeType};
pub use state::{ClientState, TransportState};
pub use subscription::ResponseHandler;
