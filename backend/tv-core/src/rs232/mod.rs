//! Plain serial-over-IP side channel.

pub mod client;
pub mod command;

pub use client::Rs232Client;
pub use command::Rs232Command;
