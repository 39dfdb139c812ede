//! Response handlers stored in the correlation table.
//!
//! The table holds `Arc<dyn ResponseHandler>`; each implementation decodes the
//! raw envelope into whatever shape it needs:
//!
//! - [`TypedSubscription`] decodes the payload as `T` and calls a user callback
//!   for every response that carries its id.
//! - [`Completion`] hands the first response to a waiting `request_for` call.
//! - [`OneShot`] wraps another handler and removes the table entry before
//!   delegating, which turns any handler into a single-response one.

use crate::error::protocol::ProtocolError;
use crate::error::handler::HandlerError;
use crate::webos::correlation::CorrelationTable;
use crate::webos::envelope::{Envelope, EnvelopeType};

use common::ErrorLocation;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

#[async_trait]
pub trait ResponseHandler: Send + Sync {
    /// Handle one raw inbound message whose id matched this entry.
    async fn handle(&self, raw: &str) -> Result<(), ProtocolError>;
}

/// Parse the envelope header and fail on `type == "error"`.
#[track_caller]
fn decode_envelope(raw: &str) -> Result<Envelope<Value>, ProtocolError> {
    let envelope: Envelope<Value> = serde_json::from_str(raw)?;

    if envelope.kind == EnvelopeType::Error {
        return Err(ProtocolError::Remote {
            message: envelope
                .error
                .unwrap_or_else(|| "device returned an error without text".to_string()),
            location: ErrorLocation::caller(),
        });
    }

    Ok(envelope)
}

#[track_caller]
fn decode_payload<T: DeserializeOwned>(payload: Option<Value>) -> Result<Option<T>, ProtocolError> {
    let location = ErrorLocation::caller();
    payload
        .map(serde_json::from_value::<T>)
        .transpose()
        .map_err(|e| ProtocolError::PayloadShape {
            message: e.to_string(),
            location,
        })
}

/// Subscriber callback with a typed payload.
pub(crate) struct TypedSubscription<T, F> {
    callback: F,
    _payload: PhantomData<fn() -> T>,
}

impl<T, F> TypedSubscription<T, F> {
    pub(crate) fn new(callback: F) -> Self {
        Self {
            callback,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> ResponseHandler for TypedSubscription<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(Envelope<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, raw: &str) -> Result<(), ProtocolError> {
        let envelope = decode_envelope(raw)?;
        let payload = decode_payload::<T>(envelope.payload)?;

        let typed = Envelope {
            id: envelope.id,
            kind: envelope.kind,
            uri: envelope.uri,
            payload,
            error: envelope.error,
        };

        (self.callback)(typed)
            .await
            .map_err(|e| ProtocolError::Handler {
                message: e.to_string(),
                location: ErrorLocation::caller(),
            })
    }
}

/// Delivers the first response (or remote error) to a waiting caller.
pub(crate) struct Completion<T> {
    sender: Mutex<Option<oneshot::Sender<Result<T, ProtocolError>>>>,
}

impl<T> Completion<T> {
    pub(crate) fn new(sender: oneshot::Sender<Result<T, ProtocolError>>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }
}

#[async_trait]
impl<T> ResponseHandler for Completion<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn handle(&self, raw: &str) -> Result<(), ProtocolError> {
        let outcome = decode_envelope(raw).and_then(|envelope| {
            decode_payload::<T>(envelope.payload)?.ok_or_else(|| ProtocolError::PayloadShape {
                message: format!("response {} carries no payload", envelope.id),
                location: ErrorLocation::caller(),
            })
        });

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        // The waiter may already have given up (cancelled); nothing to do then
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
        Ok(())
    }
}

/// Removes its own table entry, then delegates to `inner`.
pub(crate) struct OneShot {
    id: String,
    table: Weak<CorrelationTable>,
    inner: Arc<dyn ResponseHandler>,
}

impl OneShot {
    pub(crate) fn new(
        id: impl Into<String>,
        table: Weak<CorrelationTable>,
        inner: Arc<dyn ResponseHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            table,
            inner,
        }
    }
}

#[async_trait]
impl ResponseHandler for OneShot {
    async fn handle(&self, raw: &str) -> Result<(), ProtocolError> {
        if let Some(table) = self.table.upgrade() {
            table.remove(&self.id).await;
        }
        self.inner.handle(raw).await
    }
}
