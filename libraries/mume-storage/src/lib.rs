//! Mume Player - Persistence
//!
//! Durable state for the playback core on top of a plain string key/value
//! store:
//! - Queue and current index
//! - Downloaded file map (track id -> local path)
//! - Favorites
//!
//! # Architecture
//!
//! - [`KeyValueStore`](mume_core::KeyValueStore) implementations:
//!   [`MemoryStore`] and [`FileStore`]
//! - [`PlayerStorage`]: typed reads and writes that never fail past this crate
//! - [`PersistHandle`]: ordered, fire-and-forget writer task
//!
//! # Example
//!
//! ```rust
//! use mume_core::Track;
//! use mume_storage::{PersistHandle, PlayerStorage, QueueSnapshot};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let storage = PlayerStorage::in_memory();
//! let (writer, _task) = PersistHandle::spawn(storage.clone());
//!
//! writer.persist_snapshot(QueueSnapshot {
//!     queue: vec![Track::new("1", "Song", "https://cdn.example.com/1.mp4")],
//!     current_index: 0,
//! });
//! writer.flush().await;
//!
//! assert_eq!(storage.read_queue().await.len(), 1);
//! # }
//! ```

pub mod backends;
pub mod error;
pub mod keys;
mod player_storage;
mod writer;

pub use backends::{FileStore, MemoryStore};
pub use error::{Result, StorageError};
pub use player_storage::{DownloadMap, PlayerStorage, QueueSnapshot};
pub use writer::{PersistCommand, PersistHandle};
