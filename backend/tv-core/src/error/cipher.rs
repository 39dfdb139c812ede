use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CipherError {
    /// Frame too short, not block aligned, or plaintext without a line terminator.
    #[error("Frame Decode Error: {message} {location}")]
    FrameDecode {
        message: String,
        location: ErrorLocation,
    },
}
