//! Queue store - the single source of truth for queue and transport state
//!
//! A [`QueueStore`] is a cheap, cloneable handle. Every clone sees the same
//! state. Each operation locks a short critical section, never across an
//! `.await`, and before releasing it:
//! - submits a persist of queue + index when the queue changed
//! - publishes the new [`PlaybackTarget`] for the engine when it changed
//! - broadcasts [`StoreEvent`]s for UI shells

use crate::events::StoreEvent;
use crate::queue::PlayQueue;
use crate::types::{PlaybackTarget, PlayerSnapshot, SlotKey, Transport};
use mume_core::{RepeatMode, Track};
use mume_storage::{PersistHandle, PlayerStorage, QueueSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

struct PlayerState {
    queue: PlayQueue,
    /// Bumped on every change to queue contents or order
    revision: u64,
    transport: Transport,
    rng: StdRng,
}

impl PlayerState {
    fn target(&self) -> PlaybackTarget {
        PlaybackTarget {
            slot: self.queue.current().and_then(SlotKey::for_track),
            is_playing: self.transport.is_playing,
        }
    }

    fn marker(&self) -> Marker {
        Marker {
            revision: self.revision,
            index: self.queue.current_index(),
            transport: self.transport,
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue: self.queue.tracks().to_vec(),
            current_index: self.queue.current_index(),
        }
    }
}

/// What changed across one operation
#[derive(Clone, Copy, PartialEq)]
struct Marker {
    revision: u64,
    index: usize,
    transport: Transport,
}

/// Whether an operation writes the queue through to storage
#[derive(Clone, Copy, PartialEq, Eq)]
enum Persist {
    Yes,
    No,
}

struct Shared {
    state: Mutex<PlayerState>,
    target: watch::Sender<PlaybackTarget>,
    events: broadcast::Sender<StoreEvent>,
}

/// Handle to the shared queue and transport state
#[derive(Clone)]
pub struct QueueStore {
    shared: Arc<Shared>,
    storage: PlayerStorage,
    persist: PersistHandle,
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("QueueStore")
            .field("len", &state.queue.len())
            .field("current_index", &state.queue.current_index())
            .field("transport", &state.transport)
            .finish_non_exhaustive()
    }
}

impl QueueStore {
    /// Create an empty store over the given storage and writer
    pub fn new(storage: PlayerStorage, persist: PersistHandle) -> Self {
        let (target, _) = watch::channel(PlaybackTarget::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PlayerState {
                    queue: PlayQueue::new(),
                    revision: 0,
                    transport: Transport::default(),
                    rng: StdRng::from_entropy(),
                }),
                target,
                events,
            }),
            storage,
            persist,
        }
    }

    /// Store with in-memory storage and no background writer
    ///
    /// Queue writes are dropped; `persist_queue_now` still reaches the
    /// in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(PlayerStorage::in_memory(), PersistHandle::disconnected())
    }

    /// Replace the shuffle random source with a seeded one
    #[must_use]
    pub fn with_rng_seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f`, then persist and notify, all under the lock
    ///
    /// The target, persisted snapshots and events leave in mutation order
    /// across threads. None of the sends block.
    fn update<R>(&self, persist: Persist, f: impl FnOnce(&mut PlayerState) -> R) -> R {
        let mut state = self.lock();
        let before = state.marker();
        let result = f(&mut state);
        let after = state.marker();

        if persist == Persist::Yes {
            self.persist.persist_snapshot(state.snapshot());
        }

        let target = state.target();
        self.shared.target.send_if_modified(|current| {
            if *current == target {
                false
            } else {
                *current = target;
                true
            }
        });

        if before.revision != after.revision {
            self.emit(StoreEvent::QueueChanged {
                len: state.queue.len(),
            });
        }
        if before.index != after.index || before.revision != after.revision {
            self.emit(StoreEvent::IndexChanged {
                index: after.index,
                track_id: state.queue.current().map(|t| t.id.clone()),
            });
        }
        if before.transport != after.transport {
            self.emit(StoreEvent::TransportChanged(after.transport));
        }

        result
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.shared.events.send(event);
    }

    // ===== Reads =====

    /// Queue, index and transport in one consistent read
    pub fn snapshot(&self) -> PlayerSnapshot {
        let state = self.lock();
        PlayerSnapshot {
            queue: state.queue.tracks().to_vec(),
            current_index: state.queue.current_index(),
            transport: state.transport,
        }
    }

    pub fn queue(&self) -> Vec<Track> {
        self.lock().queue.tracks().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.lock().queue.current_index()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.lock().queue.current().cloned()
    }

    pub fn transport(&self) -> Transport {
        self.lock().transport
    }

    /// Track with the given id, if queued
    pub fn find(&self, id: &str) -> Option<Track> {
        let state = self.lock();
        state
            .queue
            .position_of(id)
            .and_then(|index| state.queue.get(index).cloned())
    }

    /// Latest published playback target
    pub fn playback_target(&self) -> PlaybackTarget {
        self.shared.target.borrow().clone()
    }

    /// Watch the playback target
    pub fn target(&self) -> watch::Receiver<PlaybackTarget> {
        self.shared.target.subscribe()
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    pub fn storage(&self) -> &PlayerStorage {
        &self.storage
    }

    pub fn persist_handle(&self) -> &PersistHandle {
        &self.persist
    }

    // ===== Queue operations =====

    /// Replace the queue, pointer to the first track
    pub fn set_queue(&self, tracks: Vec<Track>) {
        let len = tracks.len();
        self.update(Persist::Yes, |state| {
            state.queue.replace(tracks);
            state.revision += 1;
        });
        debug!(tracks = len, "Queue replaced");
    }

    /// Append a track unless already queued; optionally make it current
    pub fn add_to_queue(&self, track: Track, play_now: bool) {
        let id = track.id.clone();
        let appended = self.update(Persist::Yes, |state| {
            let appended = state.queue.add(track, play_now);
            if appended {
                state.revision += 1;
            }
            appended
        });
        debug!(track_id = %id, appended, play_now, "Added to queue");
    }

    /// Remove the track at `index`; out of range is a no-op
    pub fn remove_from_queue(&self, index: usize) {
        let removed = self.update(Persist::Yes, |state| {
            let removed = state.queue.remove(index);
            if removed.is_some() {
                state.revision += 1;
            }
            removed
        });
        if let Some(track) = removed {
            debug!(index, track_id = %track.id, "Removed from queue");
        }
    }

    /// Move a track; the pointer follows the track it pointed at
    pub fn reorder_queue(&self, from: usize, to: usize) {
        self.update(Persist::Yes, |state| {
            if state.queue.reorder(from, to) && from != to {
                state.revision += 1;
            }
        });
    }

    /// Point at `index` (clamped) and reset the position
    pub fn go_to_index(&self, index: usize) {
        self.update(Persist::Yes, |state| {
            if state.queue.go_to(index) {
                state.transport.position = 0.0;
            }
        });
    }

    /// Index the queue would advance to
    ///
    /// Draws from the shuffle random source when shuffle is on.
    pub fn next_index(&self) -> usize {
        let mut state = self.lock();
        let PlayerState {
            queue,
            transport,
            rng,
            ..
        } = &mut *state;
        queue.next_index(transport.shuffle, transport.repeat_mode, rng)
    }

    /// Index "previous" would move to
    pub fn prev_index(&self) -> usize {
        let state = self.lock();
        state
            .queue
            .prev_index(state.transport.position, state.transport.repeat_mode)
    }

    /// Record a downloaded file for a track
    ///
    /// Updates the queued track (if any), persists the queue and adds the
    /// mapping to the download map. A changed source on the current track
    /// makes the engine reload it.
    pub fn set_item_local_uri(&self, id: &str, path: &str) {
        let found = self.update(Persist::Yes, |state| {
            let found = state.queue.set_local_uri(id, path);
            if found {
                state.revision += 1;
            }
            found
        });
        self.persist.record_download(id, path);
        debug!(track_id = %id, path = %path, queued = found, "Local file recorded");
    }

    // ===== Transport =====

    pub fn set_playing(&self, is_playing: bool) {
        self.update(Persist::No, |state| state.transport.is_playing = is_playing);
    }

    pub fn set_position(&self, position: f64) {
        self.update(Persist::No, |state| state.transport.position = position);
    }

    pub fn set_duration(&self, duration: f64) {
        self.update(Persist::No, |state| state.transport.duration = duration);
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        self.update(Persist::No, |state| state.transport.shuffle = shuffle);
    }

    pub fn set_repeat_mode(&self, repeat_mode: RepeatMode) {
        self.update(Persist::No, |state| state.transport.repeat_mode = repeat_mode);
    }

    /// Advance the repeat mode Off -> All -> One -> Off
    pub fn cycle_repeat_mode(&self) -> RepeatMode {
        self.update(Persist::No, |state| {
            state.transport.repeat_mode = state.transport.repeat_mode.cycle();
            state.transport.repeat_mode
        })
    }

    // ===== Persistence =====

    /// Submit queue + index to the background writer
    pub fn persist_queue(&self) {
        let state = self.lock();
        self.persist.persist_snapshot(state.snapshot());
    }

    /// Write queue + index straight to storage and wait for it
    pub async fn persist_queue_now(&self) {
        let snapshot = self.lock().snapshot();
        self.storage.write_snapshot(&snapshot).await;
    }

    /// Wait for every queued background write
    pub async fn flush(&self) {
        self.persist.flush().await;
    }

    /// Restore queue and index from storage
    ///
    /// Tracks without a local file pick one up from the download map. Meant
    /// for startup; does not persist and leaves transport untouched.
    pub async fn hydrate(&self) {
        let (snapshot, downloads) =
            tokio::join!(self.storage.read_snapshot(), self.storage.read_downloads());

        let tracks: Vec<Track> = snapshot
            .queue
            .into_iter()
            .map(|mut track| {
                if !track.is_downloaded() {
                    if let Some(path) = downloads.get(&track.id) {
                        track.local_uri = Some(path.clone());
                    }
                }
                track
            })
            .collect();

        let len = tracks.len();
        let index = self.update(Persist::No, |state| {
            state.queue = PlayQueue::from_parts(tracks, snapshot.current_index);
            state.revision += 1;
            state.queue.current_index()
        });

        info!(tracks = len, index, downloads = downloads.len(), "Queue hydrated");
    }
}
