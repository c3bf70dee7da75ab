//! Player configuration
//!
//! Every setting has a default, so an empty source yields a working config.
//! Values come from an optional file and `MUME_`-prefixed environment
//! variables, with nested sections separated by `__`
//! (e.g. `MUME_ENGINE__POSITION_THROTTLE_MS=250`).

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub seek: SeekConfig,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// Playback engine tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Minimum interval between position writes into the store
    #[serde(default = "default_position_throttle_ms")]
    pub position_throttle_ms: u64,
}

/// Seek bar presentation tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeekConfig {
    /// How long a commanded or jumped-to value is held on screen
    #[serde(default = "default_settle_window_ms")]
    pub settle_window_ms: u64,

    /// Raw position within this distance of a commanded seek ends the hold
    #[serde(default = "default_settle_tolerance_secs")]
    pub settle_tolerance_secs: f64,

    /// Raw movement of at least this much counts as a jump
    #[serde(default = "default_jump_threshold_secs")]
    pub jump_threshold_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageSettings {
    /// JSON document backing the key/value store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Directory downloaded tracks are written to
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl EngineConfig {
    pub fn position_throttle(&self) -> Duration {
        Duration::from_millis(self.position_throttle_ms)
    }
}

impl SeekConfig {
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            position_throttle_ms: default_position_throttle_ms(),
        }
    }
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            settle_window_ms: default_settle_window_ms(),
            settle_tolerance_secs: default_settle_tolerance_secs(),
            jump_threshold_secs: default_jump_threshold_secs(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            download_dir: default_download_dir(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path.to_path_buf()).required(false));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("MUME")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.seek.settle_tolerance_secs.is_finite() || self.seek.settle_tolerance_secs < 0.0 {
            return Err(PlaybackError::Config(format!(
                "seek.settle_tolerance_secs must be a non-negative number, got {}",
                self.seek.settle_tolerance_secs
            )));
        }

        if !self.seek.jump_threshold_secs.is_finite() || self.seek.jump_threshold_secs <= 0.0 {
            return Err(PlaybackError::Config(format!(
                "seek.jump_threshold_secs must be positive, got {}",
                self.seek.jump_threshold_secs
            )));
        }

        Ok(())
    }
}

// Default values
fn default_position_throttle_ms() -> u64 {
    150
}

fn default_settle_window_ms() -> u64 {
    800
}

fn default_settle_tolerance_secs() -> f64 {
    0.5
}

fn default_jump_threshold_secs() -> f64 {
    2.0
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/player.json")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./data/music")
}
