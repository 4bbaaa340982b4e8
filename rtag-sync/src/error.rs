//! Error types for rtag-sync
//!
//! Failures are contained at the smallest granularity that keeps the
//! workspace consistent: a corrupt fragment is skipped, a backend failure
//! ends one task, capacity and manifest errors end the run before anything
//! destructive happens.

use crate::backend::BackendError;
use crate::services::record_info::RecordInfoError;
use thiserror::Error;

/// Result alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error taxonomy
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed manifest, invalid selection or range
    #[error("Invalid input: {0}")]
    UserInput(String),

    /// Non-corruption failure reported by the execution backend
    #[error("Backend failure: {0}")]
    Backend(#[from] BackendError),

    /// Record tool output could not be understood
    #[error("Record info: {0}")]
    RecordInfo(#[from] RecordInfoError),

    /// Destination volume cannot hold the planned fragments
    #[error("Insufficient space: need {required} bytes, {available} available after a {margin}-byte margin")]
    Capacity {
        required: u64,
        available: u64,
        margin: u64,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// rtag-common error
    #[error("Common error: {0}")]
    Common(#[from] rtag_common::Error),
}

impl SyncError {
    /// Whether the failure invalidates the whole run rather than one task
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::UserInput(_) | SyncError::Capacity { .. }
        )
    }
}
