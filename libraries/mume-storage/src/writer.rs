//! Background persistence writer
//!
//! Callers submit writes without waiting; a single task applies them in
//! submission order, so the last submitted snapshot is the one that sticks.
//!
//! ```text
//! QueueStore / FavoritesStore           persist writer task
//!        │  persist_snapshot(..)              │
//!        │───────────────────────────────────>│ write queue, write index
//!        │  record_download(..)               │
//!        │───────────────────────────────────>│ read-modify-write map
//!        │  flush().await                     │
//!        │───────────────────────────────────>│ ack once earlier writes done
//! ```

use crate::player_storage::{PlayerStorage, QueueSnapshot};
use mume_core::Track;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Write request for the persist writer
#[derive(Debug)]
pub enum PersistCommand {
    /// Replace the persisted queue and index
    Snapshot(QueueSnapshot),
    /// Add an entry to the download map
    Download { id: String, path: String },
    /// Replace the persisted favorites
    Favorites(Vec<Track>),
    /// Acknowledge once every earlier command has been applied
    Flush(oneshot::Sender<()>),
}

/// Cloneable, non-blocking sender into the persist writer
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl PersistHandle {
    /// Spawn the writer task on the current tokio runtime
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn(storage: PlayerStorage) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(storage, rx));
        (Self { tx }, task)
    }

    /// A handle with no writer behind it
    ///
    /// Every submission is dropped. Useful for purely in-memory sessions.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    fn submit(&self, command: PersistCommand) {
        if self.tx.send(command).is_err() {
            debug!("Persist writer not running, dropping write");
        }
    }

    /// Persist queue and index (fire-and-forget)
    pub fn persist_snapshot(&self, snapshot: QueueSnapshot) {
        self.submit(PersistCommand::Snapshot(snapshot));
    }

    /// Record a downloaded file (fire-and-forget)
    pub fn record_download(&self, id: impl Into<String>, path: impl Into<String>) {
        self.submit(PersistCommand::Download {
            id: id.into(),
            path: path.into(),
        });
    }

    /// Persist favorites (fire-and-forget)
    pub fn persist_favorites(&self, favorites: Vec<Track>) {
        self.submit(PersistCommand::Favorites(favorites));
    }

    /// Wait until every write submitted before this call has been applied
    ///
    /// Returns immediately when no writer is running.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Flush(ack_tx)).is_err() {
            return;
        }
        if ack_rx.await.is_err() {
            warn!("Persist writer stopped before acknowledging flush");
        }
    }
}

async fn run_writer(storage: PlayerStorage, mut rx: mpsc::UnboundedReceiver<PersistCommand>) {
    debug!("Persist writer started");

    while let Some(command) = rx.recv().await {
        match command {
            PersistCommand::Snapshot(snapshot) => storage.write_snapshot(&snapshot).await,
            PersistCommand::Download { id, path } => storage.record_download(&id, &path).await,
            PersistCommand::Favorites(favorites) => storage.write_favorites(&favorites).await,
            PersistCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    debug!("Persist writer stopped");
}
