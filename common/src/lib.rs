//! Shared building blocks for the TV control workspace.
//!
//! This crate holds the small pieces every other crate leans on:
//!
//! - [`ErrorLocation`] - file/line/column captured at the point an error is built
//! - [`RedactedSecret`] - pairing keys and shared secrets that never reach a log line
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing and secret handling
//! - **tv-core**: protocol engine operating on these types
//! - **tvctl**: command-line wiring on top of tv-core

pub mod error;
pub mod redacted_secret;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_secret::RedactedSecret;
