//! # rtag Common Library
//!
//! Shared code for the rtag record-tag tooling including:
//! - Error type shared by all crates
//! - Configuration loading (TOML) and the validated run configuration
//! - Event types and the EventBus used for progress reporting
//! - Record timestamp parsing/formatting
//! - Crash-safe filesystem helpers (atomic write, directory lock)

pub mod config;
pub mod error;
pub mod events;
pub mod fsutil;
pub mod time;

pub use error::{Error, Result};
