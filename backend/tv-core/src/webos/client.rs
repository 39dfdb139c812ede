//! Request/subscription multiplexer on top of [`WebOsConnection`].
//!
//! Every outbound envelope gets a correlation id. Subscriptions and pending
//! requests are stored in a [`CorrelationTable`] under that id, and inbound
//! envelopes are routed back to them by id.
//!
//! The client also derives its own [`ClientState`]: transport states are
//! mirrored, a pairing prompt moves it to `Pairing` and a `registered`
//! envelope moves it to `Ready` (and reports the issued client key).

use crate::error::handler::HandlerError;
use crate::error::protocol::ProtocolError;
use crate::events::{EventSource, Subscription};
use crate::webos::connection::WebOsConnection;
use crate::webos::correlation::{CorrelationIds, CorrelationTable};
use crate::webos::envelope::{Envelope, EnvelopeType, OutboundEnvelope, RegisteredPayload};
use crate::webos::pairing::PairingRequest;
use crate::webos::state::{ClientState, TransportState};
use crate::webos::subscription::{Completion, OneShot, ResponseHandler, TypedSubscription};

use common::{ErrorLocation, RedactedSecret};

use std::future::Future;
use std::panic::Location;
use std::sync::{Arc, Mutex};

use log::{debug, error, info, trace, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Marker of the device's "confirm pairing on screen" response.
const PAIRING_PROMPT_MARKER: &str = "pairingtype\":\"prompt";

/// What [`WebOsClient::dispatch`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Blank message.
    Ignored,
    PairingPrompt,
    Registered,
    /// Routed to a correlation entry.
    Delivered,
}

struct ClientShared {
    ids: CorrelationIds,
    table: Arc<CorrelationTable>,
    state: watch::Sender<ClientState>,
    on_state_changed: EventSource<ClientState>,
    on_client_key_changed: EventSource<RedactedSecret>,
}

impl ClientShared {
    async fn set_state(&self, next: ClientState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            info!("Client state changed to {next}");
            self.on_state_changed.publish(next).await;
        }
    }

    async fn apply_transport_state(&self, state: TransportState) {
        match state {
            TransportState::Connecting => self.ids.reset(),
            TransportState::Disconnected => {
                let dropped = self.table.clear().await;
                if dropped > 0 {
                    debug!("Dropped {dropped} pending entries with the closed session");
                }
            }
            TransportState::Connected => {}
        }

        self.set_state(ClientState::from(state)).await;
    }

    async fn dispatch(&self, raw: &str) -> Result<Dispatch, ProtocolError> {
        if raw.trim().is_empty() {
            return Ok(Dispatch::Ignored);
        }

        if raw.to_lowercase().contains(PAIRING_PROMPT_MARKER) {
            info!("Device is asking the user to confirm pairing");
            self.set_state(ClientState::Pairing).await;
            return Ok(Dispatch::PairingPrompt);
        }

        let envelope: Envelope = serde_json::from_str(raw)?;

        if envelope.kind == EnvelopeType::Registered {
            let client_key = serde_json::from_str::<Envelope<RegisteredPayload>>(raw)
                .ok()
                .and_then(|registered| registered.payload)
                .map(|payload| RedactedSecret::new(payload.client_key));

            let dropped = self.table.clear().await;
            trace!("Registration dropped {dropped} pending entries");

            // Key listeners have finished by the time anyone observes Ready
            match client_key {
                Some(client_key) => self.on_client_key_changed.publish(client_key).await,
                None => error!("Registered envelope {} carries no client key", envelope.id),
            }
            self.set_state(ClientState::Ready).await;
            return Ok(Dispatch::Registered);
        }

        let handler = self.table.get(&envelope.id).await.ok_or_else(|| {
            ProtocolError::UnknownCorrelation {
                id: envelope.id.clone(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        handler.handle(raw).await?;
        Ok(Dispatch::Delivered)
    }
}

/// Protocol client for the TV's application channel.
pub struct WebOsClient {
    connection: WebOsConnection,
    shared: Arc<ClientShared>,
    wiring: Mutex<Vec<Subscription>>,
}

impl WebOsClient {
    pub fn new(connection: WebOsConnection) -> Self {
        let (state, _) = watch::channel(ClientState::Disconnected);

        Self {
            connection,
            shared: Arc::new(ClientShared {
                ids: CorrelationIds::new(),
                table: Arc::new(CorrelationTable::new()),
                state,
                on_state_changed: EventSource::new("client state"),
                on_client_key_changed: EventSource::new("client key"),
            }),
            wiring: Mutex::new(Vec::new()),
        }
    }

    pub fn connection(&self) -> &WebOsConnection {
        &self.connection
    }

    pub fn state(&self) -> ClientState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.shared.state.subscribe()
    }

    pub fn on_state_changed(&self) -> &EventSource<ClientState> {
        &self.shared.on_state_changed
    }

    /// Fires with the key from every `registered` envelope.
    pub fn on_client_key_changed(&self) -> &EventSource<RedactedSecret> {
        &self.shared.on_client_key_changed
    }

    /// Wire the client to its connection and start connecting.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::AlreadyConnected`] if the client was already started.
    pub async fn connect(&self) -> Result<(), ProtocolError> {
        {
            let mut wiring = self
                .wiring
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            if !wiring.is_empty() || self.connection.state() == TransportState::Connected {
                return Err(ProtocolError::AlreadyConnected {
                    message: format!("Client for {} is already connected", self.connection.endpoint()),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            let shared = Arc::clone(&self.shared);
            wiring.push(self.connection.on_state_changed().subscribe(move |state| {
                let shared = Arc::clone(&shared);
                async move {
                    shared.apply_transport_state(state).await;
                    Ok(())
                }
            }));

            let shared = Arc::clone(&self.shared);
            wiring.push(self.connection.on_message().subscribe(move |raw: String| {
                let shared = Arc::clone(&shared);
                async move {
                    match shared.dispatch(&raw).await {
                        Ok(outcome) => trace!("Dispatched inbound message: {outcome:?}"),
                        Err(ProtocolError::UnknownCorrelation { id, .. }) => {
                            debug!("Dropping message for unknown id {id}");
                        }
                        Err(e @ ProtocolError::Json { .. }) => {
                            warn!("Dropping malformed inbound message: {e}");
                        }
                        Err(e) => error!("Failed to dispatch inbound message: {e}"),
                    }
                    Ok(())
                }
            }));
        }

        self.connection.start().await;
        Ok(())
    }

    /// Send the `register` envelope.
    ///
    /// Without a key the device shows a pairing prompt; with a previously
    /// issued key it answers `registered` directly.
    pub async fn register(
        &self,
        client_key: Option<&RedactedSecret>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), ProtocolError> {
        let key = client_key.map(RedactedSecret::expose).unwrap_or_default();
        info!(
            "Registering with {} ({} client key)",
            self.connection.endpoint(),
            if key.is_empty() { "without" } else { "with" }
        );

        self.send_envelope(
            EnvelopeType::Register,
            None,
            Some(PairingRequest::new(key)),
            None,
            cancel,
        )
        .await
        .map(|_| ())
    }

    /// Fire-and-forget request. Returns the correlation id used.
    pub async fn request<P>(
        &self,
        uri: &str,
        payload: Option<P>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ProtocolError>
    where
        P: Serialize,
    {
        self.send_envelope(EnvelopeType::Request, Some(uri), payload, None, cancel)
            .await
    }

    /// Subscribe to `uri`. `handler` runs for every response carrying the
    /// returned id until [`WebOsClient::unsubscribe`] is called.
    pub async fn subscribe<P, T, F, Fut>(
        &self,
        uri: &str,
        payload: Option<P>,
        handler: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ProtocolError>
    where
        P: Serialize,
        T: DeserializeOwned + Send + 'static,
        F: Fn(Envelope<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handler: Arc<dyn ResponseHandler> = Arc::new(TypedSubscription::new(handler));
        self.send_envelope(
            EnvelopeType::Subscribe,
            Some(uri),
            payload,
            Some(Box::new(move |_: &str| handler)),
            cancel,
        )
        .await
    }

    /// Request whose first response goes to `handler`, after which the entry
    /// is removed.
    pub async fn request_with_result<P, T, F, Fut>(
        &self,
        uri: &str,
        payload: Option<P>,
        handler: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ProtocolError>
    where
        P: Serialize,
        T: DeserializeOwned + Send + 'static,
        F: Fn(Envelope<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let inner: Arc<dyn ResponseHandler> = Arc::new(TypedSubscription::new(handler));
        let table = Arc::downgrade(&self.shared.table);
        self.send_envelope(
            EnvelopeType::Request,
            Some(uri),
            payload,
            Some(Box::new(move |id: &str| {
                Arc::new(OneShot::new(id, table, inner)) as Arc<dyn ResponseHandler>
            })),
            cancel,
        )
        .await
    }

    /// Send a request and wait for its payload decoded as `T`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Remote`] when the device answers with an error envelope
    /// - [`ProtocolError::PayloadShape`] when the payload does not decode as `T`
    /// - [`ProtocolError::SessionReset`] when the session ends before a response
    /// - [`ProtocolError::Cancelled`] when `cancel` fires while waiting
    pub async fn request_for<P, T>(
        &self,
        uri: &str,
        payload: Option<P>,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ProtocolError>
    where
        P: Serialize,
        T: DeserializeOwned + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel::<Result<T, ProtocolError>>();
        let table = Arc::downgrade(&self.shared.table);

        let id = self
            .send_envelope(
                EnvelopeType::Request,
                Some(uri),
                payload,
                Some(Box::new(move |id: &str| {
                    let completion: Arc<dyn ResponseHandler> = Arc::new(Completion::new(sender));
                    Arc::new(OneShot::new(id, table, completion)) as Arc<dyn ResponseHandler>
                })),
                cancel,
            )
            .await?;

        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {
                    self.unsubscribe(&id).await;
                    return Err(ProtocolError::Cancelled {
                        message: format!("Request {id} to {uri} cancelled while waiting"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                outcome = receiver => outcome,
            },
            None => receiver.await,
        };

        outcome.map_err(|_| ProtocolError::SessionReset {
            message: format!("Session ended before request {id} to {uri} was answered"),
            location: ErrorLocation::from(Location::caller()),
        })?
    }

    /// Remove a subscription. Returns whether it existed.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        let removed = self.shared.table.remove(id).await;
        if !removed {
            debug!("Unsubscribe for unknown id {id}");
        }
        removed
    }

    /// Close the connection and detach from its events.
    pub async fn close(&self) {
        self.connection.close().await;

        let wiring: Vec<Subscription> = self
            .wiring
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        drop(wiring);

        self.shared.table.clear().await;
        self.shared.set_state(ClientState::Disconnected).await;
    }

    /// Route one inbound message.
    #[cfg(test)]
    pub(crate) async fn dispatch(&self, raw: &str) -> Result<Dispatch, ProtocolError> {
        self.shared.dispatch(raw).await
    }

    /// Number of open subscriptions and unanswered requests.
    pub async fn pending(&self) -> usize {
        self.shared.table.len().await
    }

    #[cfg(test)]
    pub(crate) async fn track(&self, id: &str, handler: Arc<dyn ResponseHandler>) {
        self.shared.table.insert(id.to_string(), handler).await;
    }

    /// Build, serialize and send one envelope.
    ///
    /// When `track` is given, its handler is stored under the new id before
    /// the write and removed again if the write fails, so a fast response can
    /// never arrive ahead of its entry.
    async fn send_envelope<P>(
        &self,
        kind: EnvelopeType,
        uri: Option<&str>,
        payload: Option<P>,
        track: Option<Box<dyn FnOnce(&str) -> Arc<dyn ResponseHandler> + Send + '_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ProtocolError>
    where
        P: Serialize,
    {
        if self.connection.state() != TransportState::Connected {
            return Err(ProtocolError::NotReady {
                message: format!(
                    "Application channel to {} is not connected",
                    self.connection.endpoint()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let id = self.shared.ids.next()?;
        let message = serde_json::to_string(&OutboundEnvelope {
            id: &id,
            kind,
            uri,
            payload,
        })?;

        if let Some(track) = track {
            self.shared.table.insert(id.clone(), track(&id)).await;
        }

        trace!("Sending {kind:?} {id} {}", uri.unwrap_or_default());
        if let Err(e) = self.connection.send(&message, cancel).await {
            if self.shared.table.remove(&id).await {
                warn!("Dropped entry {id} after failed send");
            }
            return Err(e.into());
        }

        Ok(id)
    }
}
