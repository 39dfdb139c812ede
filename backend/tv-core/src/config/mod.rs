use crate::error::config::ConfigError;
use crate::tv::options::AcceptSequence;
use crate::{DEFAULT_IP_CONTROL_PORT, DEFAULT_RS232_PORT, DEFAULT_WEBOS_PORT};

use common::{ErrorLocation, RedactedSecret};

use std::net::IpAddr;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "tvctl";
const CONFIG_VERSION: u32 = 1;

const DEFAULT_ACCEPT_DELAY_MS: u64 = 2000;
const MAX_ACCEPT_DELAY_MS: u64 = 60_000;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TvConfig {
    /// IP address of the TV. Empty until the user sets it.
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_webos_port")]
    pub webos_port: u16,

    #[serde(default = "default_use_rs232")]
    pub use_rs232: bool,

    #[serde(default = "default_rs232_port")]
    pub rs232_port: u16,

    #[serde(default)]
    pub use_ip_control: bool,

    /// Keycode shown on the TV's IP-control settings page.
    #[serde(default)]
    pub ip_control_key: Option<String>,

    #[serde(default = "default_ip_control_port")]
    pub ip_control_port: u16,

    #[serde(default)]
    pub accept_sequence: AcceptSequence,

    #[serde(default = "default_accept_delay_ms")]
    pub accept_delay_ms: u64,
}

impl Default for TvConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            webos_port: default_webos_port(),
            use_rs232: default_use_rs232(),
            rs232_port: default_rs232_port(),
            use_ip_control: false,
            ip_control_key: None,
            ip_control_port: default_ip_control_port(),
            accept_sequence: AcceptSequence::default(),
            accept_delay_ms: default_accept_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairingConfig {
    /// Key issued by the TV on the last successful pairing.
    #[serde(default)]
    pub client_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub tv: TvConfig,

    #[serde(default)]
    pub pairing: PairingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            tv: TvConfig::default(),
            pairing: PairingConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_webos_port() -> u16 {
    DEFAULT_WEBOS_PORT
}
fn default_use_rs232() -> bool {
    true
}
fn default_rs232_port() -> u16 {
    DEFAULT_RS232_PORT
}
fn default_ip_control_port() -> u16 {
    DEFAULT_IP_CONTROL_PORT
}
fn default_accept_delay_ms() -> u64 {
    DEFAULT_ACCEPT_DELAY_MS
}

/// `<platform config dir>/tvctl`.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| ConfigError::DirectoryUnavailable {
            location: ErrorLocation::from(Location::caller()),
            reason: "No per-user config directory on this platform".to_string(),
        })
}

// ============================================
// IMPLEMENTATION
// ============================================

impl AppConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: AppConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation,
    /// serialization, write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// An empty host is accepted so a fresh config can be saved; it is
    /// rejected later when options are built from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                    self.version
                ),
            });
        }

        if !self.tv.host.is_empty() && self.tv.host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid TV host: {} (expected an IP address)", self.tv.host),
            });
        }

        for (name, port) in [
            ("webos_port", self.tv.webos_port),
            ("rs232_port", self.tv.rs232_port),
            ("ip_control_port", self.tv.ip_control_port),
        ] {
            if port == 0 {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} cannot be 0"),
                });
            }
        }

        if self.tv.use_ip_control
            && self.tv.ip_control_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "use_ip_control requires ip_control_key".to_string(),
            });
        }

        if self.tv.accept_delay_ms > MAX_ACCEPT_DELAY_MS {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid accept_delay_ms: {} (must be at most {MAX_ACCEPT_DELAY_MS})",
                    self.tv.accept_delay_ms
                ),
            });
        }

        if let Some(ref key) = self.pairing.client_key {
            if key.is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: "client_key cannot be empty string".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn client_key(&self) -> Option<RedactedSecret> {
        self.pairing.client_key.clone().map(RedactedSecret::new)
    }

    pub fn set_client_key(&mut self, key: &RedactedSecret) {
        self.pairing.client_key = Some(key.expose().to_string());
    }
}
