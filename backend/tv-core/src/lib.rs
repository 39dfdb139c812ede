//! Control library for LG webOS televisions.
//!
//! - [`webos`]: the WebSocket application channel (pairing, requests,
//!   subscriptions) with automatic reconnection
//! - [`ip_control`]: the encrypted IP-control command port
//! - [`rs232`]: the plain serial-over-IP command port
//! - [`tv`]: [`tv::TvClient`], which ties the three together

pub mod config;
pub mod error;
pub mod events;
pub mod ip_control;
pub mod rs232;
pub mod tv;
pub mod webos;

#[cfg(test)]
mod tests;

/// Port of the WebSocket application channel.
pub const DEFAULT_WEBOS_PORT: u16 = 3000;

/// Port of the plain serial-over-IP command channel.
pub const DEFAULT_RS232_PORT: u16 = 9761;

/// Port of the encrypted IP-control channel.
pub const DEFAULT_IP_CONTROL_PORT: u16 = 9761;
