//! Common error types for rtag

use thiserror::Error;

/// Common result type for rtag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across rtag crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Advisory lock could not be acquired in time
    #[error("Lock timeout: {0}")]
    LockTimeout(String),
}
