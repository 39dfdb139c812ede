//! Encrypted IP-control side channel.

pub mod cipher;
pub mod client;
pub mod keys;

pub use cipher::MessageCipher;
pub use client::IpControlClient;
pub use keys::{IpControlInput, IpControlKey};
