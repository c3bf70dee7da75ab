/// Collaborator traits for Mume Player
///
/// The playback core never talks to a platform directly. Audio output and
/// key/value persistence are provided by the embedding shell through these
/// traits.
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// String key/value persistence store
///
/// Mirrors the platform store the shell provides (e.g. app preferences).
/// Implementations guarantee last-write-wins per key; nothing more.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    ///
    /// Returns `Ok(None)` when nothing has been written yet.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Status snapshot reported by the audio capability
///
/// Positions are in milliseconds as reported by the platform decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStatus {
    /// Whether the handle has a source loaded
    pub is_loaded: bool,
    /// Current playback position
    pub position_ms: u64,
    /// Total duration, when the decoder knows it
    pub duration_ms: Option<u64>,
    /// Set on the single status emitted when playback reaches the end
    pub did_just_finish: bool,
    /// Whether the platform is looping the source natively
    pub is_looping: bool,
}

impl AudioStatus {
    /// Status of a loaded source at `position_ms`
    pub fn loaded(position_ms: u64, duration_ms: Option<u64>) -> Self {
        Self {
            is_loaded: true,
            position_ms,
            duration_ms,
            did_just_finish: false,
            is_looping: false,
        }
    }

    /// Status emitted when the source played to its end
    pub fn finished(duration_ms: u64) -> Self {
        Self {
            is_loaded: true,
            position_ms: duration_ms,
            duration_ms: Some(duration_ms),
            did_just_finish: true,
            is_looping: false,
        }
    }

    /// Position in seconds
    pub fn position_secs(&self) -> f64 {
        self.position_ms as f64 / 1000.0
    }

    /// Duration in seconds, when known
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / 1000.0)
    }
}

/// Receiver for asynchronous status updates of one loaded source
///
/// Handed to [`AudioBackend::load`]; the backend calls it from whatever
/// context its decoder runs in. Implementations must not block.
pub trait StatusListener: Send + Sync {
    /// Deliver a status update
    fn on_status(&self, status: AudioStatus);
}

/// A loaded audio source
///
/// Exclusively owned by the playback engine. Every handle must be unloaded
/// exactly once before it is dropped.
#[async_trait]
pub trait AudioHandle: Send + Sync {
    /// Start or resume playback
    async fn play(&self) -> Result<()>;

    /// Pause playback
    async fn pause(&self) -> Result<()>;

    /// Seek to `position_ms` from the start of the source
    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Release the decoder and output resources
    async fn unload(&self) -> Result<()>;

    /// Query the current status
    async fn status(&self) -> Result<AudioStatus>;
}

/// Platform audio decoder/output capability
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Load `uri` paused (`shouldPlay = false`) and subscribe `listener` to its
    /// status feed
    async fn load(&self, uri: &str, listener: Arc<dyn StatusListener>)
        -> Result<Box<dyn AudioHandle>>;
}
