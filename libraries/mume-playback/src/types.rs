//! Shared playback types

use mume_core::{RepeatMode, Track};
use serde::{Deserialize, Serialize};

/// Transport state
///
/// Never persisted; every session starts paused at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    /// Whether playback should be running
    pub is_playing: bool,
    /// Position in seconds
    pub position: f64,
    /// Duration in seconds, 0 when unknown
    pub duration: f64,
    /// Pick the next track at random
    pub shuffle: bool,
    pub repeat_mode: RepeatMode,
}

/// Full player state at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub queue: Vec<Track>,
    pub current_index: usize,
    pub transport: Transport,
}

impl PlayerSnapshot {
    /// Track at the current index
    pub fn current_track(&self) -> Option<&Track> {
        self.queue.get(self.current_index)
    }
}

/// Identity of the audio the engine should have loaded
///
/// Two keys are equal when they name the same track with the same resolved
/// source. Index shifts caused by edits elsewhere in the queue do not change
/// the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub track_id: String,
    pub uri: String,
}

impl SlotKey {
    /// Key for a track, `None` when it has no playable source
    pub fn for_track(track: &Track) -> Option<Self> {
        track.source().map(|uri| Self {
            track_id: track.id.clone(),
            uri: uri.to_string(),
        })
    }
}

/// What the engine should be doing, as published by the queue store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackTarget {
    /// Source to hold, `None` for an empty queue or a track without source
    pub slot: Option<SlotKey>,
    pub is_playing: bool,
}
