use crate::error::{Result, StorageError};
use async_trait::async_trait;
use mume_core::KeyValueStore;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key/value store backed by a single JSON document on disk
///
/// The whole document is cached after the first access and rewritten on
/// every `set`. Writes go to a sibling temp file which is then renamed over
/// the document, so a crash mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileStore {
    /// Create a store for the document at `path`
    ///
    /// Nothing is read until the first access. A missing file is an empty
    /// store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the document, treating corruption as an empty store
    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match self.read_document().await {
            Err(StorageError::Corrupt { path, reason }) => {
                warn!(path = %path, reason = %reason, "Discarding corrupt store document");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    async fn write_document(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let raw = serde_json::to_string(entries)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), keys = entries.len(), "Store document written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> mume_core::Result<Option<String>> {
        let mut cache = self.entries.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: String) -> mume_core::Result<()> {
        let mut cache = self.entries.lock().await;
        let entries = match cache.take() {
            Some(entries) => entries,
            None => self.load().await?,
        };
        let entries = cache.insert(entries);
        entries.insert(key.to_string(), value);
        self.write_document(entries).await?;
        Ok(())
    }
}
