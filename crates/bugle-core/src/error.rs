//! Shared error types.

use thiserror::Error;

/// Errors surfaced at the library seams of the fan-out subsystem.
#[derive(Error, Debug)]
pub enum BugleError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fan-out operations.
pub type BugleResult<T> = Result<T, BugleError>;

impl BugleError {
    /// Create a transport error from any displayable cause.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }
}
