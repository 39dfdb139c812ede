//! Runtime options of [`TvClient`](crate::tv::TvClient).

use crate::config::AppConfig;
use crate::error::config::ConfigError;
use crate::ip_control::IpControlKey;
use crate::rs232::Rs232Command;
use crate::{DEFAULT_IP_CONTROL_PORT, DEFAULT_RS232_PORT, DEFAULT_WEBOS_PORT};

use common::{ErrorLocation, RedactedSecret};

use std::net::{IpAddr, SocketAddr};
use std::panic::Location;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ACCEPT_DELAY: Duration = Duration::from_secs(2);

/// Key presses that confirm the on-screen pairing prompt.
///
/// Which one works depends on where the TV firmware places the focus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptSequence {
    #[default]
    DownEnter,
    RightEnter,
}

impl AcceptSequence {
    pub fn ip_control_keys(self) -> [IpControlKey; 2] {
        match self {
            AcceptSequence::DownEnter => [IpControlKey::ArrowDown, IpControlKey::Ok],
            AcceptSequence::RightEnter => [IpControlKey::ArrowRight, IpControlKey::Ok],
        }
    }

    pub fn rs232_commands(self) -> [Rs232Command; 2] {
        match self {
            AcceptSequence::DownEnter => [Rs232Command::Down, Rs232Command::Enter],
            AcceptSequence::RightEnter => [Rs232Command::Right, Rs232Command::Enter],
        }
    }
}

#[derive(Debug, Clone)]
pub struct TvOptions {
    pub address: IpAddr,
    pub webos_port: u16,
    pub use_rs232: bool,
    pub rs232_port: u16,
    pub use_ip_control: bool,
    pub ip_control_key: Option<RedactedSecret>,
    pub ip_control_port: u16,
    pub accept_sequence: AcceptSequence,
    /// Pause between the two accept key presses.
    pub accept_delay: Duration,
}

impl TvOptions {
    /// Options with every default applied.
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            webos_port: DEFAULT_WEBOS_PORT,
            use_rs232: true,
            rs232_port: DEFAULT_RS232_PORT,
            use_ip_control: false,
            ip_control_key: None,
            ip_control_port: DEFAULT_IP_CONTROL_PORT,
            accept_sequence: AcceptSequence::default(),
            accept_delay: DEFAULT_ACCEPT_DELAY,
        }
    }

    pub fn rs232_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.rs232_port)
    }

    pub fn ip_control_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.ip_control_port)
    }
}

impl TryFrom<&AppConfig> for TvOptions {
    type Error = ConfigError;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        config.validate()?;

        let address = config
            .tv
            .host
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("TV host {:?} is not an IP address: {e}", config.tv.host),
            })?;

        Ok(Self {
            address,
            webos_port: config.tv.webos_port,
            use_rs232: config.tv.use_rs232,
            rs232_port: config.tv.rs232_port,
            use_ip_control: config.tv.use_ip_control,
            ip_control_key: config.tv.ip_control_key.clone().map(RedactedSecret::new),
            ip_control_port: config.tv.ip_control_port,
            accept_sequence: config.tv.accept_sequence,
            accept_delay: Duration::from_millis(config.tv.accept_delay_ms),
        })
    }
}
