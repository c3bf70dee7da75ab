//! Typed persistence adapter
//!
//! Reads never fail: missing, unparseable or wrongly-shaped data is logged and
//! replaced by an empty default. Writes never fail either: errors are logged
//! and swallowed. Nothing crosses this boundary as an error.

use crate::backends::MemoryStore;
use crate::keys::{DOWNLOADS_KEY, FAVORITES_KEY, QUEUE_INDEX_KEY, QUEUE_KEY};
use mume_core::{KeyValueStore, Track};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Downloaded files: track id -> local path
pub type DownloadMap = BTreeMap<String, String>;

/// Persisted queue state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Tracks in playback order
    pub queue: Vec<Track>,
    /// Index of the current track
    pub current_index: usize,
}

/// Typed access to the player's persisted state
#[derive(Clone)]
pub struct PlayerStorage {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for PlayerStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStorage").finish_non_exhaustive()
    }
}

impl PlayerStorage {
    /// Wrap a key/value store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Storage backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The underlying key/value store
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Store read failed, using default");
                None
            }
        }
    }

    async fn write_raw(&self, key: &str, raw: String) {
        if let Err(e) = self.store.set(key, raw).await {
            warn!(key = %key, error = %e, "Store write failed");
        }
    }

    /// Read and deserialize a JSON value, or its default
    pub async fn read_json<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.read_raw(key).await else {
            return T::default();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Unparseable stored value, using default");
            T::default()
        })
    }

    /// Serialize and write a JSON value
    pub async fn write_json<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(value) {
            Ok(raw) => self.write_raw(key, raw).await,
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize value"),
        }
    }

    /// Read a JSON array of tracks, skipping entries that do not parse
    async fn read_tracks(&self, key: &str) -> Vec<Track> {
        let Some(raw) = self.read_raw(key).await else {
            return Vec::new();
        };

        let items = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => items,
            Ok(_) => {
                warn!(key = %key, "Stored tracks are not an array, ignoring");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Unparseable stored tracks, ignoring");
                return Vec::new();
            }
        };

        let total = items.len();
        let tracks: Vec<Track> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();

        if tracks.len() != total {
            warn!(
                key = %key,
                dropped = total - tracks.len(),
                "Skipped malformed stored tracks"
            );
        }
        tracks
    }

    /// Persisted queue, or an empty one
    pub async fn read_queue(&self) -> Vec<Track> {
        self.read_tracks(QUEUE_KEY).await
    }

    /// Persisted queue index, or 0
    ///
    /// Negative or non-numeric values read as 0.
    pub async fn read_queue_index(&self) -> usize {
        self.read_raw(QUEUE_INDEX_KEY)
            .await
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map_or(0, |n| usize::try_from(n.max(0)).unwrap_or(0))
    }

    /// Persisted download map, or an empty one
    ///
    /// Entries whose value is not a string are dropped.
    pub async fn read_downloads(&self) -> DownloadMap {
        let value: serde_json::Value = self.read_json(DOWNLOADS_KEY).await;
        match value {
            serde_json::Value::Object(map) => map
                .into_iter()
                .filter_map(|(id, path)| match path {
                    serde_json::Value::String(path) => Some((id, path)),
                    _ => None,
                })
                .collect(),
            serde_json::Value::Null => DownloadMap::new(),
            _ => {
                warn!("Stored download map is not an object, ignoring");
                DownloadMap::new()
            }
        }
    }

    /// Persisted favorites, or an empty list
    pub async fn read_favorites(&self) -> Vec<Track> {
        self.read_tracks(FAVORITES_KEY).await
    }

    /// Queue and index as one snapshot
    pub async fn read_snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue: self.read_queue().await,
            current_index: self.read_queue_index().await,
        }
    }

    /// Write the queue
    pub async fn write_queue(&self, queue: &[Track]) {
        self.write_json(QUEUE_KEY, queue).await;
    }

    /// Write the queue index
    pub async fn write_queue_index(&self, index: usize) {
        self.write_raw(QUEUE_INDEX_KEY, index.to_string()).await;
    }

    /// Write queue then index
    pub async fn write_snapshot(&self, snapshot: &QueueSnapshot) {
        self.write_queue(&snapshot.queue).await;
        self.write_queue_index(snapshot.current_index).await;
        debug!(
            tracks = snapshot.queue.len(),
            index = snapshot.current_index,
            "Queue persisted"
        );
    }

    /// Write the download map
    pub async fn write_downloads(&self, downloads: &DownloadMap) {
        self.write_json(DOWNLOADS_KEY, downloads).await;
    }

    /// Add one entry to the download map
    pub async fn record_download(&self, id: &str, path: &str) {
        let mut downloads = self.read_downloads().await;
        downloads.insert(id.to_string(), path.to_string());
        self.write_downloads(&downloads).await;
    }

    /// Write the favorites list
    pub async fn write_favorites(&self, favorites: &[Track]) {
        self.write_json(FAVORITES_KEY, favorites).await;
    }
}
