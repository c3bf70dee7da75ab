//! Store events
//!
//! Broadcast to UI shells so they can re-render without polling. Events are
//! hints: a lagging receiver should re-read [`QueueStore::snapshot`](crate::QueueStore::snapshot).

use crate::types::Transport;
use serde::{Deserialize, Serialize};

/// Change notification from the queue store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreEvent {
    /// Queue contents or order changed
    QueueChanged {
        /// New queue length
        len: usize,
    },

    /// Current track pointer changed
    IndexChanged {
        /// New current index
        index: usize,
        /// ID of the track now under the pointer
        track_id: Option<String>,
    },

    /// Transport state changed (playing flag, position, duration, modes)
    TransportChanged(Transport),
}
