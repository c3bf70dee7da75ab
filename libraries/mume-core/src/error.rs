/// Core error types for Mume Player
use thiserror::Error;

/// Result type alias using `MumeError`
pub type Result<T> = std::result::Result<T, MumeError>;

/// Core error type for Mume Player
#[derive(Error, Debug)]
pub enum MumeError {
    /// Audio capability errors (load, play, pause, seek, unload)
    #[error("Audio error: {0}")]
    Audio(String),

    /// Key/value store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl MumeError {
    /// Create an audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
