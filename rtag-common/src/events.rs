//! Sync progress events and the EventBus that carries them
//!
//! The pipeline emits [`SyncEvent`]s as it works; the CLI subscribes and
//! renders them. Emission never blocks and never fails the run.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted during a sync or library run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Capacity check passed, slicing is about to begin
    RunStarted {
        task_count: usize,
        total_bytes: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A task's destination directories are prepared
    TaskStarted {
        task_id: String,
        task_name: String,
        fragment_count: usize,
    },

    /// One fragment finished (successfully or skipped as corrupt)
    FragmentFinished {
        task_id: String,
        partition: String,
        /// Destination file name
        fragment: String,
        /// `success`, `corrupt_skipped`, or `fatal`
        outcome: String,
    },

    /// Overall progress, monotonically non-decreasing within a run
    Progress {
        /// 0.0 ..= 1.0
        fraction: f64,
        processed_bytes: u64,
        total_bytes: u64,
    },

    /// A task's contract has been merged and its README written
    TaskCompleted { task_id: String, fragments: usize },

    /// A task stopped early because of a fatal slicing error
    TaskFailed { task_id: String, error: String },

    /// The run ended
    RunCompleted {
        completed_tasks: usize,
        failed_tasks: usize,
        cancelled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The library index was served from cache or rebuilt
    LibraryLoaded { entries: usize, from_cache: bool },
}

/// Broadcast bus for [`SyncEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SyncEvent,
    ) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
