//! JSON envelopes exchanged on the application channel.
//!
//! Outbound: `{"id", "type", "uri"?, "payload"?}` with absent fields omitted.
//! Inbound: the same shape, plus an `error` text on `type == "error"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeType {
    Register,
    Request,
    Subscribe,
    Response,
    Error,
    Registered,
    /// Anything the device sends that is not in the list above.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutboundEnvelope<'a, P> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
}

/// An inbound envelope whose payload has been decoded as `P`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<P = Value> {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    #[serde(default)]
    pub uri: Option<String>,
    pub payload: Option<P>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of a `registered` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RegisteredPayload {
    #[serde(rename = "client-key")]
    pub client_key: String,
}
