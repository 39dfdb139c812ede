//! Client for the TV's encrypted IP-control port.
//!
//! Each request is a single encrypted frame `NAME arg1 arg2...`. Replies are
//! read separately with [`IpControlClient::receive`]; one read yields one
//! message.

use crate::error::ip_control::IpControlError;
use crate::ip_control::cipher::MessageCipher;
use crate::ip_control::keys::{IpControlInput, IpControlKey};

use common::{ErrorLocation, RedactedSecret};

use std::future::Future;
use std::net::SocketAddr;
use std::panic::Location;
use std::time::Duration;

use log::{debug, info, trace};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout as TokioTimeout;
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest reply read in one go.
pub const RECEIVE_BUFFER_SIZE: usize = 1024;

const APP_LAUNCH: &str = "APP_LAUNCH";
const MUTE_STATE: &str = "MUTE_STATE";
const CURRENT_CHANNEL: &str = "CURRENT_CH";
const CURRENT_APP: &str = "CURRENT_APP";
const CURRENT_VOLUME: &str = "CURRENT_VOL";
const GET_MAC_ADDRESS: &str = "GET_MACADDRESS";
const INPUT_SELECT: &str = "INPUT_SELECT";
const KEY_ACTION: &str = "KEY_ACTION";

pub struct IpControlClient {
    address: SocketAddr,
    cipher: MessageCipher,
    stream: Option<TcpStream>,
}

impl IpControlClient {
    pub fn new(address: SocketAddr, keycode: &RedactedSecret) -> Self {
        Self {
            address,
            cipher: MessageCipher::new(keycode.expose()),
            stream: None,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn connect(&mut self, cancel: Option<&CancellationToken>) -> Result<(), IpControlError> {
        let address = self.address;
        let stream = cancellable(cancel, async move {
            TokioTimeout(CONNECT_TIMEOUT, TcpStream::connect(address))
                .await
                .map_err(|_| IpControlError::Io {
                    message: format!("Connecting to {address} timed out after {CONNECT_TIMEOUT:?}"),
                    location: ErrorLocation::from(Location::caller()),
                })?
                .map_err(IpControlError::from)
        })
        .await?;

        info!("IP control connected to {}", self.address);
        self.stream = Some(stream);
        Ok(())
    }

    /// Encrypt and write `name args...` as one frame.
    pub async fn send_command(&mut self, name: &str, args: &[&str]) -> Result<(), IpControlError> {
        let mut command = String::from(name);
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }

        let frame = self.cipher.encode(&command);
        let address = self.address;
        let stream = self.stream_mut()?;

        stream.write_all(&frame).await?;
        stream.flush().await?;

        debug!("IP control command {name} sent to {address} ({} bytes)", frame.len());
        Ok(())
    }

    pub async fn launch_app(&mut self, app_id: &str) -> Result<(), IpControlError> {
        self.send_command(APP_LAUNCH, &[app_id]).await
    }

    pub async fn request_mute_state(&mut self) -> Result<(), IpControlError> {
        self.send_command(MUTE_STATE, &[]).await
    }

    pub async fn request_current_channel(&mut self) -> Result<(), IpControlError> {
        self.send_command(CURRENT_CHANNEL, &[]).await
    }

    pub async fn request_current_app(&mut self) -> Result<(), IpControlError> {
        self.send_command(CURRENT_APP, &[]).await
    }

    pub async fn request_current_volume(&mut self) -> Result<(), IpControlError> {
        self.send_command(CURRENT_VOLUME, &[]).await
    }

    /// `device` selects the interface, e.g. `wired` or `wifi`.
    pub async fn request_mac_address(&mut self, device: &str) -> Result<(), IpControlError> {
        self.send_command(GET_MAC_ADDRESS, &[device]).await
    }

    pub async fn switch_input(&mut self, input: IpControlInput) -> Result<(), IpControlError> {
        self.send_command(INPUT_SELECT, &[input.identifier()]).await
    }

    pub async fn send_key(&mut self, key: IpControlKey) -> Result<(), IpControlError> {
        self.send_command(KEY_ACTION, &[key.code()]).await
    }

    /// Read and decode one reply.
    ///
    /// # Errors
    ///
    /// [`IpControlError::Closed`] when the peer closed the connection.
    pub async fn receive(&mut self, cancel: Option<&CancellationToken>) -> Result<String, IpControlError> {
        let address = self.address;
        let stream = self.stream_mut()?;

        let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
        let read = cancellable(cancel, async {
            stream.read(&mut buffer).await.map_err(IpControlError::from)
        })
        .await?;

        if read == 0 {
            return Err(IpControlError::Closed {
                message: format!("{address} closed the IP control connection"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let message = self.cipher.decode(&buffer[..read])?;
        trace!("IP control reply from {address}: {message}");
        Ok(message)
    }

    /// Shut the socket down. Safe to call when not connected.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("IP control shutdown for {} failed: {e}", self.address);
            }
            info!("IP control disconnected from {}", self.address);
        }
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, IpControlError> {
        let address = self.address;
        self.stream.as_mut().ok_or_else(|| IpControlError::NotConnected {
            message: format!("IP control to {address} is not connected. Call connect first"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

async fn cancellable<T, F>(cancel: Option<&CancellationToken>, operation: F) -> Result<T, IpControlError>
where
    F: Future<Output = Result<T, IpControlError>>,
{
    match cancel {
        Some(token) => tokio::select! {
            _ = token.cancelled() => Err(IpControlError::Cancelled {
                message: "IP control operation cancelled".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            result = operation => result,
        },
        None => operation.await,
    }
}
