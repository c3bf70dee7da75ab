//! Error types for playback management

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The engine task has stopped and can no longer take commands
    #[error("Playback engine is not running")]
    EngineStopped,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for PlaybackError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors from a track download
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Track id cannot be used as a file name
    #[error("Invalid track id for download: {0:?}")]
    InvalidTrackId(String),

    /// Track has no stream URL to fetch
    #[error("Track {0} has no stream URL")]
    MissingSource(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Download failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
