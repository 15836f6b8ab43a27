//! Reportbell error types.

use thiserror::Error;

/// Top-level error type shared across Reportbell crates.
#[derive(Error, Debug)]
pub enum ReportbellError {
    /// Configuration problem — fatal at startup, never raised inside the loop.
    #[error("Config error: {0}")]
    Config(String),

    /// Store (SQLite) problem.
    #[error("Store error: {0}")]
    Store(String),

    /// Notification delivery problem.
    #[error("Notify error: {0}")]
    Notify(String),

    /// Filesystem problem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across Reportbell crates.
pub type Result<T> = std::result::Result<T, ReportbellError>;
