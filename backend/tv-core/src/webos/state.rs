//! Transport and client state machines of the application channel.

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// State of the WebSocket transport. Only the connection manager changes it.
///
/// Transitions always run `Disconnected -> Connecting -> Connected -> Disconnected`;
/// `Connecting` is never skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
}

/// State of the protocol client as seen by callers.
///
/// The first three values mirror [`TransportState`]. `Pairing` and `Ready` are
/// derived from message content: a pairing prompt and a `registered` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Pairing,
    Ready,
}

impl From<TransportState> for ClientState {
    fn from(state: TransportState) -> Self {
        match state {
            TransportState::Disconnected => ClientState::Disconnected,
            TransportState::Connecting => ClientState::Connecting,
            TransportState::Connected => ClientState::Connected,
        }
    }
}

impl Display for TransportState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        Display::fmt(&ClientState::from(*self), formatter)
    }
}

impl Display for ClientState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ClientState::Disconnected => "disconnected",
            ClientState::Connecting => "connecting",
            ClientState::Connected => "connected",
            ClientState::Pairing => "pairing",
            ClientState::Ready => "ready",
        };
        formatter.write_str(name)
    }
}
