//! Error types for slate-core

use thiserror::Error;

/// Result type alias using slate-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in slate-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Row-store client error
    #[error("Row store error: {0}")]
    Store(String),

    /// Snapshot refresh failed; the caller keeps the last known-good snapshot
    #[error("Snapshot fetch failed: {0}")]
    Fetch(String),

    /// A logical id no longer resolves to a physical row
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored row does not match the expected column layout
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
