//! Mume Player - Playback
//!
//! Queue and transport state plus the engine that keeps an audio backend in
//! step with it.
//!
//! This crate provides:
//! - [`QueueStore`]: shared queue, current index and transport, persisted
//!   through `mume-storage`
//! - [`PlaybackEngine`]: single task owning the one active audio handle
//! - [`SeekFilter`]: seek bar display that does not snap back after a seek
//! - [`FavoritesStore`] and [`Downloader`]
//! - [`PlayerConfig`]: file + environment configuration
//!
//! # Architecture
//!
//! ```text
//!   UI ──intents──> QueueStore ──PlaybackTarget (watch)──> PlaybackEngine
//!    ^                  │  ^                                   │     ^
//!    └──StoreEvent──────┘  └──position / duration / playing────┘     │
//!                       │                                            │
//!                  PersistHandle                          AudioBackend / AudioHandle
//! ```
//!
//! The store is the only source of truth. The engine never reorders the
//! queue; it writes transport values and moves the index on auto-advance.
//!
//! # Example
//!
//! ```rust
//! use mume_core::Track;
//! use mume_playback::QueueStore;
//!
//! let store = QueueStore::in_memory();
//! store.set_queue(vec![
//!     Track::new("1", "First", "https://cdn.example.com/1.mp4"),
//!     Track::new("2", "Second", "https://cdn.example.com/2.mp4"),
//! ]);
//!
//! store.go_to_index(1);
//! assert_eq!(store.current_track().map(|t| t.id), Some("2".to_string()));
//! assert_eq!(store.next_index(), 1); // repeat off, already last
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod events;
pub mod favorites;
pub mod queue;
pub mod seek;
pub mod store;
pub mod types;

// Re-exports
pub use config::{EngineConfig, PlayerConfig, SeekConfig, StorageSettings};
pub use download::Downloader;
pub use engine::{EngineCommand, EngineHandle, PlaybackEngine, SlotState};
pub use error::{DownloadError, PlaybackError, Result};
pub use events::StoreEvent;
pub use favorites::FavoritesStore;
pub use queue::PlayQueue;
pub use seek::{format_time, slider_max, SeekFilter};
pub use store::QueueStore;
pub use types::{PlaybackTarget, PlayerSnapshot, SlotKey, Transport};
