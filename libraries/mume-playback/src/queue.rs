//! Ordered play queue with a current-track pointer
//!
//! Pure data structure: no I/O, no locking, no notifications. The
//! [`QueueStore`](crate::QueueStore) wraps it with persistence and change
//! publication.
//!
//! The pointer is kept inside `[0, len)` for a non-empty queue and is 0 for
//! an empty one. Operations with out-of-range indices are silent no-ops.

use mume_core::{RepeatMode, Track};
use rand::Rng;

/// Going back from further than this restarts the current track instead
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayQueue {
    tracks: Vec<Track>,
    current_index: usize,
}

impl PlayQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue from stored parts, clamping the index into range
    pub fn from_parts(tracks: Vec<Track>, index: usize) -> Self {
        let current_index = index.min(tracks.len().saturating_sub(1));
        Self {
            tracks,
            current_index,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Track under the pointer
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Position of a track by id
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Replace the whole queue, pointer back to the first track
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.current_index = 0;
    }

    /// Append a track unless one with the same id is queued already
    ///
    /// With `play_now` the pointer moves to that id, whether it was just
    /// appended or already present. Returns `true` if the track was appended.
    pub fn add(&mut self, track: Track, play_now: bool) -> bool {
        let (position, appended) = match self.position_of(&track.id) {
            Some(existing) => (existing, false),
            None => {
                self.tracks.push(track);
                (self.tracks.len() - 1, true)
            }
        };

        if play_now {
            self.current_index = position;
        }
        appended
    }

    /// Remove the track at `index`
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }

        let removed = self.tracks.remove(index);
        let len = self.tracks.len();

        if len == 0 {
            self.current_index = 0;
        } else if index < self.current_index {
            self.current_index -= 1;
        } else {
            self.current_index = self.current_index.min(len - 1);
        }

        Some(removed)
    }

    /// Move the track at `from` so it ends up at `to`
    ///
    /// The pointer follows the track it pointed at. Returns `false` when
    /// either index is out of range.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        let current = self.current_index;
        self.current_index = if current == from {
            to
        } else if from < current && current <= to {
            current - 1
        } else if to <= current && current < from {
            current + 1
        } else {
            current
        };
        true
    }

    /// Point at `index`, clamped into range
    ///
    /// Returns `false` (and does nothing) for an empty queue.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.tracks.is_empty() {
            return false;
        }
        self.current_index = index.min(self.tracks.len() - 1);
        true
    }

    /// Set the local file of a queued track
    ///
    /// Returns `false` if no track has that id.
    pub fn set_local_uri(&mut self, id: &str, path: &str) -> bool {
        match self.tracks.iter_mut().find(|t| t.id == id) {
            Some(track) => {
                track.local_uri = Some(path.to_string());
                true
            }
            None => false,
        }
    }

    /// Index auto-advance and "next" should move to
    ///
    /// With shuffle on, any index may come up, the current one included.
    pub fn next_index<R>(&self, shuffle: bool, repeat: RepeatMode, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let len = self.tracks.len();
        if len == 0 {
            return 0;
        }
        if repeat == RepeatMode::One {
            return self.current_index;
        }
        if shuffle {
            return rng.gen_range(0..len);
        }
        if self.current_index + 1 >= len {
            return if repeat == RepeatMode::All {
                0
            } else {
                self.current_index
            };
        }
        self.current_index + 1
    }

    /// Index "previous" should move to, given the current position in seconds
    pub fn prev_index(&self, position: f64, repeat: RepeatMode) -> usize {
        let len = self.tracks.len();
        if len == 0 {
            return 0;
        }
        if position > RESTART_THRESHOLD_SECS {
            return self.current_index;
        }
        if self.current_index == 0 {
            return if repeat == RepeatMode::All { len - 1 } else { 0 };
        }
        self.current_index - 1
    }
}
