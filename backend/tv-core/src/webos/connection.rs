//! Connection manager for the TV's application channel (WebSocket).
//!
//! [`WebOsConnection::start`] spawns a supervisor task that keeps one socket
//! open for as long as the connection is alive:
//!
//! 1. publish `Disconnected`, drop any previous socket, publish `Connecting`
//! 2. connect with a [`CONNECT_TIMEOUT`] deadline
//! 3. publish `Connected` and read messages until the peer closes or fails
//! 4. go back to 1
//!
//! Two device sentinels short-circuit the read loop: a pairing rate-limit
//! reply and a power-state refusal. Both close the socket, wait a fixed delay
//! and reconnect. Everything else is handed to the `on_message` subscribers
//! without blocking the read loop.

use crate::error::connection::ConnectionError;
use crate::events::EventSource;
use crate::webos::state::TransportState;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Deadline for the WebSocket handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a single outbound write.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait after the device reports too many pairing requests.
pub const PAIRING_RATE_LIMIT_DELAY: Duration = Duration::from_secs(3);

/// Wait after the device refuses the connection because of its power state.
pub const POWER_STATE_DELAY: Duration = Duration::from_secs(1);

const RECONNECT_INITIAL_DELAY: Duration = Duration::from_millis(250);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(5);

// Matched case-insensitively against the raw message text
const TOO_MANY_PAIRING_REQUESTS: &str = "403 too many pairing requests";
const POWER_STATE_REFUSED: &str = "403 error!! power state";

const CLOSE_REASON: &str = "Closing connection";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How a connected session ended.
enum SessionEnd {
    /// Peer closed or the read failed; reconnect right away.
    Closed,
    /// A device sentinel asked us to back off before reconnecting.
    BackOff(Duration),
    Cancelled,
}

struct Shared {
    endpoint: Url,
    sink: Mutex<Option<WsSink>>,
    state: watch::Sender<TransportState>,
    on_state_changed: EventSource<TransportState>,
    on_message: EventSource<String>,
    cancel: CancellationToken,
}

/// Self-healing WebSocket connection to `ws://<host>:<port>`.
///
/// A connection runs once: after [`WebOsConnection::close`] it stays
/// `Disconnected` and a new instance is needed to reconnect.
pub struct WebOsConnection {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl WebOsConnection {
    pub fn new(host: &str, port: u16) -> Result<Self, ConnectionError> {
        let endpoint = Url::parse(&format!("ws://{host}:{port}"))?;

        let (state, _) = watch::channel(TransportState::Disconnected);

        Ok(Self {
            shared: Arc::new(Shared {
                endpoint,
                sink: Mutex::new(None),
                state,
                on_state_changed: EventSource::new("transport state"),
                on_message: EventSource::new("inbound message"),
                cancel: CancellationToken::new(),
            }),
            supervisor: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    pub fn state(&self) -> TransportState {
        *self.shared.state.borrow()
    }

    /// Receiver that always holds the latest transport state.
    pub fn watch_state(&self) -> watch::Receiver<TransportState> {
        self.shared.state.subscribe()
    }

    pub fn on_state_changed(&self) -> &EventSource<TransportState> {
        &self.shared.on_state_changed
    }

    pub fn on_message(&self) -> &EventSource<String> {
        &self.shared.on_message
    }

    /// Spawn the supervisor task. Calling it again while it runs is a no-op.
    pub async fn start(&self) {
        let mut supervisor = self.supervisor.lock().await;

        if supervisor.is_some() {
            debug!("Connection to {} already started", self.shared.endpoint);
            return;
        }

        if self.shared.cancel.is_cancelled() {
            warn!("Connection to {} was closed and cannot restart", self.shared.endpoint);
            return;
        }

        info!("Starting connection to {}", self.shared.endpoint);
        *supervisor = Some(tokio::spawn(supervise(Arc::clone(&self.shared))));
    }

    /// Write one text message.
    ///
    /// Fails with [`ConnectionError::NotReady`] unless the socket is open,
    /// [`ConnectionError::SendTimeout`] after [`SEND_TIMEOUT`], and
    /// [`ConnectionError::Cancelled`] if `cancel` fires first.
    pub async fn send(
        &self,
        message: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), ConnectionError> {
        let mut guard = self.shared.sink.lock().await;

        let connected = *self.shared.state.borrow() == TransportState::Connected;
        let sink = match guard.as_mut() {
            Some(sink) if connected => sink,
            _ => {
                return Err(ConnectionError::NotReady {
                    message: format!("WebSocket to {} is not open", self.shared.endpoint),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let write = TokioTimeout(SEND_TIMEOUT, sink.send(Message::text(message.to_owned())));

        let written = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {
                    return Err(ConnectionError::Cancelled {
                        message: "Send cancelled by caller".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                written = write => written,
            },
            None => write.await,
        };

        match written {
            Ok(Ok(())) => {
                trace!("Sent {} bytes to {}", message.len(), self.shared.endpoint);
                Ok(())
            }
            Ok(Err(e)) => Err(ConnectionError::Send {
                message: format!("Failed to send to {}: {e}", self.shared.endpoint),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(_) => Err(ConnectionError::SendTimeout {
                message: format!("Timeout of {SEND_TIMEOUT:?} reached while sending message"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Stop the supervisor, close the socket and publish `Disconnected`.
    pub async fn close(&self) {
        self.shared.cancel.cancel();

        let supervisor = self.supervisor.lock().await.take();
        if let Some(supervisor) = supervisor {
            if let Err(e) = supervisor.await {
                warn!("Connection supervisor for {} ended abnormally: {e}", self.shared.endpoint);
            }
        }

        close_socket(&self.shared).await;
        set_state(&self.shared, TransportState::Disconnected).await;
    }
}

impl Drop for WebOsConnection {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

async fn set_state(shared: &Shared, next: TransportState) {
    let changed = shared.state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });

    if changed {
        debug!("Transport to {} is now {next}", shared.endpoint);
        shared.on_state_changed.publish(next).await;
    }
}

async fn close_socket(shared: &Shared) {
    let Some(mut sink) = shared.sink.lock().await.take() else {
        return;
    };

    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: CLOSE_REASON.into(),
    };

    match TokioTimeout(SEND_TIMEOUT, sink.send(Message::Close(Some(frame)))).await {
        Ok(Ok(())) => trace!("Sent close frame to {}", shared.endpoint),
        Ok(Err(e)) => debug!("Close frame to {} failed: {e}", shared.endpoint),
        Err(_) => debug!("Close frame to {} timed out", shared.endpoint),
    }
}

/// Sleep for `delay`. Returns `false` if cancelled first.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = TokioSleep(delay) => true,
    }
}

fn reconnect_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: RECONNECT_INITIAL_DELAY,
        max_interval: RECONNECT_MAX_DELAY,
        max_elapsed_time: None,
        ..Default::default()
    }
}

async fn supervise(shared: Arc<Shared>) {
    let mut backoff = reconnect_backoff();

    while !shared.cancel.is_cancelled() {
        set_state(&shared, TransportState::Disconnected).await;
        shared.sink.lock().await.take();
        set_state(&shared, TransportState::Connecting).await;

        let attempt = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            attempt = TokioTimeout(CONNECT_TIMEOUT, connect_async(shared.endpoint.as_str())) => attempt,
        };

        let stream = match attempt {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                let delay = backoff.next_backoff().unwrap_or(RECONNECT_MAX_DELAY);
                warn!(
                    "Failed to connect to {}: {e}; retrying after {delay:?}",
                    shared.endpoint
                );
                if !pause(&shared.cancel, delay).await {
                    break;
                }
                continue;
            }
            Err(_) => {
                warn!(
                    "Reached timeout of {CONNECT_TIMEOUT:?} while connecting to {}",
                    shared.endpoint
                );
                continue;
            }
        };

        backoff.reset();
        info!("Connected to {}", shared.endpoint);

        let (sink, mut source) = stream.split();
        *shared.sink.lock().await = Some(sink);
        set_state(&shared, TransportState::Connected).await;

        match read_session(&shared, &mut source).await {
            SessionEnd::Closed => {}
            SessionEnd::BackOff(delay) => {
                close_socket(&shared).await;
                if !pause(&shared.cancel, delay).await {
                    break;
                }
            }
            SessionEnd::Cancelled => break,
        }
    }

    close_socket(&shared).await;
    set_state(&shared, TransportState::Disconnected).await;
    debug!("Connection supervisor for {} stopped", shared.endpoint);
}

async fn read_session(shared: &Shared, source: &mut WsSource) -> SessionEnd {
    loop {
        let next = tokio::select! {
            _ = shared.cancel.cancelled() => return SessionEnd::Cancelled,
            next = source.next() => next,
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            Some(Ok(Message::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
            Some(Ok(Message::Close(frame))) => {
                info!("{} closed the connection: {frame:?}", shared.endpoint);
                return SessionEnd::Closed;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("Error reading from {}: {e}", shared.endpoint);
                return SessionEnd::Closed;
            }
            None => {
                info!("{} ended the stream", shared.endpoint);
                return SessionEnd::Closed;
            }
        };

        let lowered = text.to_lowercase();
        if lowered.contains(TOO_MANY_PAIRING_REQUESTS) {
            warn!("Device reported too many pairing requests; waiting {PAIRING_RATE_LIMIT_DELAY:?}");
            return SessionEnd::BackOff(PAIRING_RATE_LIMIT_DELAY);
        }
        if lowered.contains(POWER_STATE_REFUSED) {
            warn!("Device refused the connection in its power state; waiting {POWER_STATE_DELAY:?}");
            return SessionEnd::BackOff(POWER_STATE_DELAY);
        }

        trace!("Received {} bytes from {}", text.len(), shared.endpoint);
        shared.on_message.publish_detached(text);
    }
}
