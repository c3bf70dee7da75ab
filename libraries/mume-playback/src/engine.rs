//! Playback engine - drives one audio handle from the queue store
//!
//! The engine is a single tokio task. It reacts, one event at a time, to:
//! - [`PlaybackTarget`] changes published by the [`QueueStore`]
//! - load results coming back from spawned load tasks
//! - status ticks from the audio backend
//! - commands from [`EngineHandle`]
//!
//! # Slot lifecycle
//!
//! ```text
//!            source changed                 load ok (latest generation)
//!   Idle ──────────────────────> Loading ───────────────────────────────> Ready
//!    ^                            │  ^                                     │
//!    │  load failed / no source   │  │        source changed               │
//!    └────────────────────────────┘  └─────────────────────────────────────┘
//!                                         (old handle unloaded first)
//! ```
//!
//! Every load is tagged with a generation number. A result or status tick
//! carrying anything but the active generation is stale: stale handles are
//! unloaded on arrival and never become active, and stale ticks are dropped.
//! There is never more than one active handle.

use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::store::QueueStore;
use crate::types::{PlaybackTarget, SlotKey};
use mume_core::{AudioBackend, AudioHandle, AudioStatus, RepeatMode, StatusListener};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Observable slot state, for UI spinners and diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Idle,
    Loading {
        generation: u64,
        track_id: String,
    },
    Ready {
        generation: u64,
        track_id: String,
    },
}

enum Slot {
    Idle,
    Loading {
        generation: u64,
        key: SlotKey,
    },
    Ready {
        generation: u64,
        key: SlotKey,
        handle: Box<dyn AudioHandle>,
    },
}

impl Slot {
    fn state(&self) -> SlotState {
        match self {
            Self::Idle => SlotState::Idle,
            Self::Loading { generation, key } => SlotState::Loading {
                generation: *generation,
                track_id: key.track_id.clone(),
            },
            Self::Ready {
                generation, key, ..
            } => SlotState::Ready {
                generation: *generation,
                track_id: key.track_id.clone(),
            },
        }
    }

    fn is_ready(&self, generation: u64) -> bool {
        matches!(self, Self::Ready { generation: g, .. } if *g == generation)
    }

    fn is_loading(&self, generation: u64) -> bool {
        matches!(self, Self::Loading { generation: g, .. } if *g == generation)
    }
}

enum EngineEvent {
    Loaded {
        generation: u64,
        key: SlotKey,
        result: mume_core::Result<Box<dyn AudioHandle>>,
    },
    Status {
        generation: u64,
        status: AudioStatus,
    },
}

/// Commands sent from [`EngineHandle`] to the engine task
#[derive(Debug)]
pub enum EngineCommand {
    /// Seek the active handle (seconds)
    Seek(f64),
    /// Seek the active handle back to the start
    RestartCurrent,
    /// Unload and stop; acknowledged once the handle is released
    Shutdown(oneshot::Sender<()>),
}

/// Forwards backend status ticks into the engine, tagged with a generation
struct GenerationListener {
    generation: u64,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl StatusListener for GenerationListener {
    fn on_status(&self, status: AudioStatus) {
        // Engine gone: nothing left to update
        let _ = self.events.send(EngineEvent::Status {
            generation: self.generation,
            status,
        });
    }
}

enum Wake {
    Target(bool),
    Event(EngineEvent),
    Command(Option<EngineCommand>),
}

/// The engine task state
pub struct PlaybackEngine {
    store: QueueStore,
    backend: Arc<dyn AudioBackend>,
    config: EngineConfig,
    slot: Slot,
    /// Latest minted generation
    generation: u64,
    /// Target the slot currently reflects; `None` before the first one
    applied: Option<PlaybackTarget>,
    last_position_write: Option<Instant>,
    target_rx: watch::Receiver<PlaybackTarget>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    commands_rx: mpsc::UnboundedReceiver<EngineCommand>,
    state_tx: watch::Sender<SlotState>,
}

impl PlaybackEngine {
    /// Spawn the engine on the current tokio runtime
    ///
    /// The engine immediately applies the store's current target. It stops
    /// on [`EngineHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(
        store: QueueStore,
        backend: Arc<dyn AudioBackend>,
        config: EngineConfig,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SlotState::Idle);

        let engine = Self {
            target_rx: store.target(),
            store: store.clone(),
            backend,
            config,
            slot: Slot::Idle,
            generation: 0,
            applied: None,
            last_position_write: None,
            events_tx,
            events_rx,
            commands_rx,
            state_tx,
        };
        let task = tokio::spawn(engine.run());

        (
            EngineHandle {
                store,
                commands: commands_tx,
                slot_state: state_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        info!("Playback engine started");

        let initial = self.target_rx.borrow_and_update().clone();
        self.apply_target(initial).await;

        let ack = loop {
            let wake = tokio::select! {
                changed = self.target_rx.changed() => Wake::Target(changed.is_ok()),
                Some(event) = self.events_rx.recv() => Wake::Event(event),
                command = self.commands_rx.recv() => Wake::Command(command),
            };

            match wake {
                Wake::Target(true) => {
                    let target = self.target_rx.borrow_and_update().clone();
                    self.apply_target(target).await;
                }
                Wake::Event(EngineEvent::Loaded {
                    generation,
                    key,
                    result,
                }) => self.on_loaded(generation, key, result).await,
                Wake::Event(EngineEvent::Status { generation, status }) => {
                    self.on_status(generation, status).await;
                }
                Wake::Command(Some(EngineCommand::Shutdown(ack))) => break Some(ack),
                Wake::Command(Some(command)) => self.on_command(command).await,
                Wake::Target(false) | Wake::Command(None) => break None,
            }
        };

        self.release().await;
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        info!("Playback engine stopped");
    }

    /// Swap the slot, unloading a ready handle in the background
    ///
    /// Returns the unload task so a following load can wait for it.
    fn transition(&mut self, next: Slot) -> Option<JoinHandle<()>> {
        self.state_tx.send_replace(next.state());
        match std::mem::replace(&mut self.slot, next) {
            Slot::Ready {
                generation, handle, ..
            } => Some(tokio::spawn(unload_quietly(handle, generation))),
            Slot::Idle | Slot::Loading { .. } => None,
        }
    }

    async fn release(&mut self) {
        self.generation += 1;
        if let Some(unloading) = self.transition(Slot::Idle) {
            let _ = unloading.await;
        }
    }

    async fn apply_target(&mut self, target: PlaybackTarget) {
        let previous = self.applied.replace(target.clone());

        match previous {
            Some(previous) if previous.slot == target.slot => {
                if previous.is_playing == target.is_playing {
                    return;
                }
                let idle = matches!(self.slot, Slot::Idle);
                match target.slot {
                    // Retry after a failed load
                    Some(key) if idle && target.is_playing => self.begin_load(key),
                    _ => self.apply_playing(target.is_playing).await,
                }
            }
            _ => match target.slot {
                Some(key) => self.begin_load(key),
                None => self.clear_source(),
            },
        }
    }

    /// Apply whatever target is published right now
    async fn sync_target(&mut self) {
        let target = self.target_rx.borrow_and_update().clone();
        self.apply_target(target).await;
    }

    fn begin_load(&mut self, key: SlotKey) {
        self.generation += 1;
        let generation = self.generation;

        let unloading = self.transition(Slot::Loading {
            generation,
            key: key.clone(),
        });
        self.last_position_write = None;
        self.store.set_position(0.0);
        self.store.set_duration(0.0);

        debug!(generation, track_id = %key.track_id, uri = %key.uri, "Loading source");

        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        let listener: Arc<dyn StatusListener> = Arc::new(GenerationListener {
            generation,
            events: self.events_tx.clone(),
        });

        tokio::spawn(async move {
            if let Some(unloading) = unloading {
                let _ = unloading.await;
            }
            let result = backend.load(&key.uri, listener).await;
            let _ = events.send(EngineEvent::Loaded {
                generation,
                key,
                result,
            });
        });
    }

    fn clear_source(&mut self) {
        self.generation += 1;
        self.transition(Slot::Idle);
        self.last_position_write = None;
        self.store.set_position(0.0);
        self.store.set_duration(0.0);
        self.store.set_playing(false);
        debug!(generation = self.generation, "No source, engine idle");
    }

    async fn on_loaded(
        &mut self,
        generation: u64,
        key: SlotKey,
        result: mume_core::Result<Box<dyn AudioHandle>>,
    ) {
        if !self.slot.is_loading(generation) {
            match result {
                Ok(handle) => {
                    debug!(generation, latest = self.generation, "Discarding stale load");
                    tokio::spawn(unload_quietly(handle, generation));
                }
                Err(e) => debug!(generation, error = %e, "Stale load failed"),
            }
            return;
        }

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                warn!(generation, track_id = %key.track_id, uri = %key.uri, error = %e, "Failed to load source");
                self.transition(Slot::Idle);
                self.store.set_playing(false);
                return;
            }
        };

        match handle.status().await {
            Ok(status) => {
                if let Some(duration) = status.duration_secs() {
                    self.store.set_duration(duration);
                }
            }
            Err(e) => debug!(generation, error = %e, "Status unavailable after load"),
        }

        info!(generation, track_id = %key.track_id, "Source ready");
        self.transition(Slot::Ready {
            generation,
            key,
            handle,
        });

        if self.store.transport().is_playing {
            self.apply_playing(true).await;
        }
    }

    async fn on_status(&mut self, generation: u64, status: AudioStatus) {
        if !self.slot.is_ready(generation) {
            trace!(generation, active = self.generation, "Dropping stale status");
            return;
        }
        if !status.is_loaded {
            return;
        }

        let now = Instant::now();
        let due = self
            .last_position_write
            .map_or(true, |last| now.duration_since(last) >= self.config.position_throttle());
        if due || status.did_just_finish {
            self.last_position_write = Some(now);
            self.store.set_position(status.position_secs());
        }

        if let Some(duration) = status.duration_secs() {
            self.store.set_duration(duration);
        }

        if status.did_just_finish && !status.is_looping {
            self.on_finished().await;
        }
    }

    async fn on_finished(&mut self) {
        let current = self.store.current_index();
        let next = self.store.next_index();

        if next != current {
            info!(from = current, to = next, "Track finished, advancing");
            self.store.go_to_index(next);
            self.store.set_playing(true);
            self.sync_target().await;
        } else if self.store.transport().repeat_mode == RepeatMode::One {
            debug!(index = current, "Track finished, repeating");
            self.last_position_write = Some(Instant::now());
            self.store.set_position(0.0);
            self.seek_active(0).await;
            self.apply_playing(true).await;
            self.store.set_playing(true);
        } else {
            info!(index = current, "Track finished, end of queue");
            self.store.set_playing(false);
        }
    }

    async fn on_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Seek(seconds) => {
                self.last_position_write = Some(Instant::now());
                self.seek_active(seconds_to_ms(seconds)).await;
            }
            EngineCommand::RestartCurrent => {
                self.last_position_write = Some(Instant::now());
                self.seek_active(0).await;
            }
            // Handled by the run loop
            EngineCommand::Shutdown(_) => {}
        }
    }

    async fn seek_active(&mut self, position_ms: u64) {
        let Slot::Ready {
            generation, handle, ..
        } = &self.slot
        else {
            return;
        };

        if let Err(e) = handle.seek(position_ms).await {
            warn!(generation = *generation, position_ms, error = %e, "Seek failed");
        }
    }

    async fn apply_playing(&mut self, playing: bool) {
        let Slot::Ready {
            generation, handle, ..
        } = &self.slot
        else {
            return;
        };

        let result = if playing {
            handle.play().await
        } else {
            handle.pause().await
        };

        if let Err(e) = result {
            warn!(generation = *generation, playing, error = %e, "Transport command failed");
            if playing {
                self.store.set_playing(false);
            }
        }
    }
}

async fn unload_quietly(handle: Box<dyn AudioHandle>, generation: u64) {
    match handle.unload().await {
        Ok(()) => trace!(generation, "Handle unloaded"),
        Err(e) => debug!(generation, error = %e, "Unload failed, ignoring"),
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

/// Cloneable control surface for a running engine
///
/// Transport intents go through the queue store; the engine picks them up
/// from the published target. Seeks and restarts go to the engine directly.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    store: QueueStore,
    commands: mpsc::UnboundedSender<EngineCommand>,
    slot_state: watch::Receiver<SlotState>,
}

impl EngineHandle {
    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn play(&self) {
        self.store.set_playing(true);
    }

    pub fn pause(&self) {
        self.store.set_playing(false);
    }

    pub fn toggle(&self) {
        let playing = self.store.transport().is_playing;
        self.store.set_playing(!playing);
    }

    /// Seek to `seconds`
    ///
    /// The store position is updated right away; the backend seek follows.
    /// A failed backend seek is logged and not rolled back.
    pub fn seek_to(&self, seconds: f64) -> Result<()> {
        let seconds = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        self.store.set_position(seconds);
        self.send(EngineCommand::Seek(seconds))
    }

    /// Skip ahead, unless that would not move
    pub fn next(&self) {
        let current = self.store.current_index();
        let next = self.store.next_index();
        if next != current {
            self.store.go_to_index(next);
        }
    }

    /// Go back, or restart the current track when already past its start
    pub fn prev(&self) -> Result<()> {
        if self.store.is_empty() {
            return Ok(());
        }

        let current = self.store.current_index();
        let prev = self.store.prev_index();
        self.store.go_to_index(prev);

        if prev == current {
            self.send(EngineCommand::RestartCurrent)?;
        }
        Ok(())
    }

    pub fn slot_state(&self) -> SlotState {
        self.slot_state.borrow().clone()
    }

    /// Watch slot state transitions
    pub fn watch_slot(&self) -> watch::Receiver<SlotState> {
        self.slot_state.clone()
    }

    /// Unload the active handle and stop the engine
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown(ack_tx))?;
        ack_rx.await.map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::EngineStopped)
    }
}
