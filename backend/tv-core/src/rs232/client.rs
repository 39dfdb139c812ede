//! Client for the TV's plain serial-over-IP command port.

use crate::error::rs232::Rs232Error;
use crate::rs232::command::Rs232Command;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::time::Duration;

use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout as TokioTimeout;
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const LINE_TERMINATOR: &str = "\r\n";

pub struct Rs232Client {
    address: SocketAddr,
    stream: Option<TcpStream>,
}

impl Rs232Client {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            stream: None,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn connect(&mut self, cancel: Option<&CancellationToken>) -> Result<(), Rs232Error> {
        let address = self.address;
        let connect = TokioTimeout(CONNECT_TIMEOUT, TcpStream::connect(address));

        let attempt = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {
                    return Err(Rs232Error::Cancelled {
                        message: format!("Connecting to {address} cancelled"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                attempt = connect => attempt,
            },
            None => connect.await,
        };

        let stream = attempt.map_err(|_| Rs232Error::Io {
            message: format!("Connecting to {address} timed out after {CONNECT_TIMEOUT:?}"),
            location: ErrorLocation::from(Location::caller()),
        })??;

        info!("RS232 channel connected to {address}");
        self.stream = Some(stream);
        Ok(())
    }

    pub async fn send_command(&mut self, command: Rs232Command) -> Result<(), Rs232Error> {
        debug!("RS232 command {command:?}");
        self.send_raw(command.text()).await
    }

    /// Write `text` followed by CR LF.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), Rs232Error> {
        let address = self.address;
        let stream = self.stream.as_mut().ok_or_else(|| Rs232Error::NotConnected {
            message: format!("RS232 channel to {address} is not connected. Call connect first"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let line = format!("{text}{LINE_TERMINATOR}");
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("RS232 shutdown for {} failed: {e}", self.address);
            }
            info!("RS232 channel disconnected from {}", self.address);
        }
    }
}
