//! rtag-sync library interface
//!
//! Finds the record fragments covering tagged moments, slices them down to
//! each tag's window, keeps per-tag contracts on disk and indexes the result
//! for playback. The filesystem is the only source of truth.

pub mod backend;
pub mod error;
pub mod services;

pub use crate::error::{SyncError, SyncResult};
