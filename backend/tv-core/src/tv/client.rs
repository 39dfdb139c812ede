//! Device-level client combining the application channel with the two side
//! channels.
//!
//! The application channel stays connected for the lifetime of the client.
//! IP-control and RS232 sessions are short-lived: every use opens a fresh
//! connection through [`TvClient::with_ip_control`] / [`TvClient::with_rs232`]
//! and closes it again on every exit path.
//!
//! When the TV shows its pairing prompt the client confirms it by sending the
//! configured [`AcceptSequence`](crate::tv::options::AcceptSequence) over a
//! side channel.

use crate::error::tv::TvError;
use crate::events::{EventSource, Subscription};
use crate::ip_control::IpControlClient;
use crate::rs232::Rs232Client;
use crate::tv::button::{TvButton, TvInput};
use crate::tv::options::TvOptions;
use crate::tv::requests::{
    APP_LAUNCH, AppRequest, BROWSER_APP_ID, CREATE_TOAST, CreateToastRequest, EXECUTE_ONE_SHOT,
    LIVE_TV_APP_ID, LaunchBrowserRequest, NO_PAYLOAD, OPEN_CHANNEL, OneShotResponse,
    OpenChannelRequest, SCREEN_OFF, SCREEN_ON, SET_MUTE, SET_VOLUME, SWITCH_INPUT, SYSTEM_CLOSE,
    SYSTEM_LAUNCH, SetMuteRequest, SetVolumeRequest, SwitchInputRequest, TURN_OFF, VOLUME_DOWN,
    VOLUME_UP,
};
use crate::tv::wake;
use crate::webos::{ClientState, WebOsClient, WebOsConnection};

use common::{ErrorLocation, RedactedSecret};

use std::panic::Location;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures_util::future::BoxFuture;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};
use tokio_util::sync::CancellationToken;

/// Highest volume the TV accepts.
pub const MAX_VOLUME: u8 = 100;

struct TvShared {
    options: TvOptions,
    webos: WebOsClient,
    on_state_changed: EventSource<ClientState>,
    on_client_key_changed: EventSource<RedactedSecret>,
    on_authenticate_requested: EventSource<()>,
    cancel: CancellationToken,
    wiring: Mutex<Vec<Subscription>>,
}

/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct TvClient {
    shared: Arc<TvShared>,
}

impl TvClient {
    pub fn new(options: TvOptions) -> Result<Self, TvError> {
        let connection = WebOsConnection::new(&options.address.to_string(), options.webos_port)
            .map_err(|e| TvError::Protocol(e.into()))?;

        Ok(Self {
            shared: Arc::new(TvShared {
                options,
                webos: WebOsClient::new(connection),
                on_state_changed: EventSource::new("tv state"),
                on_client_key_changed: EventSource::new("tv client key"),
                on_authenticate_requested: EventSource::new("authenticate requested"),
                cancel: CancellationToken::new(),
                wiring: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn options(&self) -> &TvOptions {
        &self.shared.options
    }

    pub fn webos(&self) -> &WebOsClient {
        &self.shared.webos
    }

    pub fn state(&self) -> ClientState {
        self.shared.webos.state()
    }

    /// Client state, forwarded after any pairing auto-accept has run.
    pub fn on_state_changed(&self) -> &EventSource<ClientState> {
        &self.shared.on_state_changed
    }

    pub fn on_client_key_changed(&self) -> &EventSource<RedactedSecret> {
        &self.shared.on_client_key_changed
    }

    /// Fires whenever the application channel (re)connects. Subscribers are
    /// expected to call [`TvClient::authenticate`].
    pub fn on_authenticate_requested(&self) -> &EventSource<()> {
        &self.shared.on_authenticate_requested
    }

    pub async fn connect(&self) -> Result<(), TvError> {
        {
            let mut wiring = self
                .shared
                .wiring
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            let weak = Arc::downgrade(&self.shared);
            wiring.push(self.shared.webos.on_state_changed().subscribe(move |state| {
                let weak: Weak<TvShared> = weak.clone();
                async move {
                    if let Some(shared) = weak.upgrade() {
                        shared.handle_state(state).await;
                    }
                    Ok(())
                }
            }));

            let weak = Arc::downgrade(&self.shared);
            wiring.push(self.shared.webos.on_client_key_changed().subscribe(move |key| {
                let weak: Weak<TvShared> = weak.clone();
                async move {
                    if let Some(shared) = weak.upgrade() {
                        info!("TV issued a new client key");
                        shared.on_client_key_changed.publish(key).await;
                    }
                    Ok(())
                }
            }));
        }

        self.shared.webos.connect().await?;
        Ok(())
    }

    /// Register with the TV, reusing `client_key` when one is known.
    pub async fn authenticate(&self, client_key: Option<&RedactedSecret>) -> Result<(), TvError> {
        self.shared
            .webos
            .register(client_key, Some(&self.shared.cancel))
            .await?;
        Ok(())
    }

    /// Wait until the client reaches `target`.
    pub async fn wait_for_state(&self, target: ClientState, timeout: Duration) -> Result<(), TvError> {
        let mut state = self.shared.webos.watch_state();

        let reached = TokioTimeout(timeout, async move {
            state.wait_for(|current| *current == target).await.map(|_| ())
        })
        .await;

        match reached {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(TvError::Timeout {
                message: format!(
                    "TV did not reach state {target} within {timeout:?} (currently {})",
                    self.state()
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    // ============================================
    // SIDE CHANNELS
    // ============================================

    /// Run `operation` on a fresh IP-control connection, then close it.
    pub async fn with_ip_control<R, F>(&self, operation: F) -> Result<R, TvError>
    where
        F: for<'a> FnOnce(&'a mut IpControlClient) -> BoxFuture<'a, Result<R, TvError>>,
    {
        self.shared.with_ip_control(operation).await
    }

    /// Run `operation` on a fresh RS232 connection, then close it.
    pub async fn with_rs232<R, F>(&self, operation: F) -> Result<R, TvError>
    where
        F: for<'a> FnOnce(&'a mut Rs232Client) -> BoxFuture<'a, Result<R, TvError>>,
    {
        self.shared.with_rs232(operation).await
    }

    /// Press `button` on every enabled side channel.
    pub async fn press_button(&self, button: TvButton) -> Result<(), TvError> {
        let options = &self.shared.options;

        if !options.use_ip_control && !options.use_rs232 {
            return Err(TvError::ChannelDisabled {
                message: format!("Cannot press {button:?}: no side channel is enabled"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if options.use_ip_control {
            let key = button.ip_control_key();
            self.with_ip_control(move |client| {
                Box::pin(async move {
                    client.send_key(key).await?;
                    Ok(())
                })
            })
            .await?;
        }

        if options.use_rs232 {
            let command = button.rs232_command();
            self.with_rs232(move |client| {
                Box::pin(async move {
                    client.send_command(command).await?;
                    Ok(())
                })
            })
            .await?;
        }

        Ok(())
    }

    /// Send a Wake-on-LAN packet to the TV's address.
    pub async fn wake_on_lan(&self, mac: &str) -> Result<(), TvError> {
        wake::send_magic_packet(self.shared.options.address, mac).await
    }

    // ============================================
    // APPLICATION CHANNEL REQUESTS
    // ============================================

    pub async fn set_volume(&self, volume: u8) -> Result<(), TvError> {
        let volume = volume.min(MAX_VOLUME);
        self.send(SET_VOLUME, Some(SetVolumeRequest { volume })).await
    }

    pub async fn set_mute(&self, mute: bool) -> Result<(), TvError> {
        self.send(SET_MUTE, Some(SetMuteRequest { mute })).await
    }

    pub async fn volume_up(&self) -> Result<(), TvError> {
        self.send(VOLUME_UP, NO_PAYLOAD).await
    }

    pub async fn volume_down(&self) -> Result<(), TvError> {
        self.send(VOLUME_DOWN, NO_PAYLOAD).await
    }

    pub async fn show_toast(&self, message: &str) -> Result<(), TvError> {
        self.send(CREATE_TOAST, Some(CreateToastRequest { message }))
            .await
    }

    pub async fn turn_off(&self) -> Result<(), TvError> {
        self.send(TURN_OFF, NO_PAYLOAD).await
    }

    pub async fn screen_on(&self) -> Result<(), TvError> {
        self.send(SCREEN_ON, NO_PAYLOAD).await
    }

    pub async fn screen_off(&self) -> Result<(), TvError> {
        self.send(SCREEN_OFF, NO_PAYLOAD).await
    }

    pub async fn open_browser(&self, url: &str) -> Result<(), TvError> {
        self.send(SYSTEM_LAUNCH, Some(LaunchBrowserRequest::new(url)))
            .await
    }

    pub async fn close_browser(&self) -> Result<(), TvError> {
        self.close_app(BROWSER_APP_ID).await
    }

    pub async fn launch_app(&self, app_id: &str) -> Result<(), TvError> {
        self.send(APP_LAUNCH, Some(AppRequest { id: app_id })).await
    }

    pub async fn close_app(&self, app_id: &str) -> Result<(), TvError> {
        self.send(SYSTEM_CLOSE, Some(AppRequest { id: app_id })).await
    }

    pub async fn set_channel(&self, channel: u32) -> Result<(), TvError> {
        self.send(
            OPEN_CHANNEL,
            Some(OpenChannelRequest {
                channel_number: channel.to_string(),
            }),
        )
        .await
    }

    pub async fn switch_input(&self, input: TvInput) -> Result<(), TvError> {
        match input.input_id() {
            Some(input_id) => {
                self.send(SWITCH_INPUT, Some(SwitchInputRequest { input_id }))
                    .await
            }
            None => self.launch_app(LIVE_TV_APP_ID).await,
        }
    }

    /// Capture the current picture. Returns the URI the TV serves it from.
    pub async fn screenshot(&self) -> Result<String, TvError> {
        self.ensure_ready()?;

        let response: OneShotResponse = self
            .shared
            .webos
            .request_for(EXECUTE_ONE_SHOT, NO_PAYLOAD, Some(&self.shared.cancel))
            .await?;

        Ok(response.image_uri)
    }

    /// Stop everything: pending side-channel work, the application channel
    /// and the event wiring.
    pub async fn close(&self) {
        self.shared.cancel.cancel();
        self.shared.webos.close().await;

        let wiring: Vec<Subscription> = self
            .shared
            .wiring
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        drop(wiring);

        info!("TV client for {} closed", self.shared.options.address);
    }

    fn ensure_ready(&self) -> Result<(), TvError> {
        let state = self.state();
        if state != ClientState::Ready {
            return Err(TvError::NotReady {
                message: format!("TV is {state}; commands need the ready state"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    async fn send<P: Serialize>(&self, uri: &str, payload: Option<P>) -> Result<(), TvError> {
        self.ensure_ready()?;

        let id = self
            .shared
            .webos
            .request(uri, payload, Some(&self.shared.cancel))
            .await?;

        debug!("Request {id} sent to {uri}");
        Ok(())
    }
}

impl TvShared {
    async fn handle_state(&self, state: ClientState) {
        match state {
            ClientState::Connected => self.on_authenticate_requested.publish(()).await,
            ClientState::Pairing => {
                if let Err(e) = self.accept_pairing().await {
                    warn!("Could not confirm the pairing prompt: {e}");
                }
            }
            _ => {}
        }

        self.on_state_changed.publish(state).await;
    }

    /// Press the accept sequence on the first enabled side channel.
    async fn accept_pairing(&self) -> Result<(), TvError> {
        let sequence = self.options.accept_sequence;
        let delay = self.options.accept_delay;
        let cancel = self.cancel.clone();

        if self.options.use_ip_control {
            info!("Confirming pairing over IP control with {sequence:?}");
            let [first, second] = sequence.ip_control_keys();
            self.with_ip_control(move |client| {
                Box::pin(async move {
                    client.send_key(first).await?;
                    pause(&cancel, delay).await?;
                    client.send_key(second).await?;
                    Ok(())
                })
            })
            .await
        } else if self.options.use_rs232 {
            info!("Confirming pairing over RS232 with {sequence:?}");
            let [first, second] = sequence.rs232_commands();
            self.with_rs232(move |client| {
                Box::pin(async move {
                    client.send_command(first).await?;
                    pause(&cancel, delay).await?;
                    client.send_command(second).await?;
                    Ok(())
                })
            })
            .await
        } else {
            info!("No side channel enabled; the pairing prompt must be confirmed on the TV");
            Ok(())
        }
    }

    async fn with_ip_control<R, F>(&self, operation: F) -> Result<R, TvError>
    where
        F: for<'a> FnOnce(&'a mut IpControlClient) -> BoxFuture<'a, Result<R, TvError>>,
    {
        let keycode = self
            .options
            .ip_control_key
            .as_ref()
            .ok_or_else(|| TvError::ChannelDisabled {
                message: "IP control needs a keycode".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut client = IpControlClient::new(self.options.ip_control_address(), keycode);
        client.connect(Some(&self.cancel)).await?;

        let result = operation(&mut client).await;
        client.close().await;
        result
    }

    async fn with_rs232<R, F>(&self, operation: F) -> Result<R, TvError>
    where
        F: for<'a> FnOnce(&'a mut Rs232Client) -> BoxFuture<'a, Result<R, TvError>>,
    {
        let mut client = Rs232Client::new(self.options.rs232_address());
        client.connect(Some(&self.cancel)).await?;

        let result = operation(&mut client).await;
        client.close().await;
        result
    }
}

async fn pause(cancel: &CancellationToken, delay: Duration) -> Result<(), TvError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(TvError::Cancelled {
            message: "Accept sequence cancelled".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }),
        _ = TokioSleep(delay) => Ok(()),
    }
}
