//! Device-level orchestration: pairing auto-accept, typed commands and the
//! scoped side-channel sessions.

pub mod button;
pub mod client;
pub mod options;
pub mod requests;
pub mod wake;

pub use button::{TvButton, TvInput};
pub use client::TvClient;
pub use options::{AcceptSequence, TvOptions};
