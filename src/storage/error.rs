//! Error types for the storage layer

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unique-key violation (duplicate repository or event triple)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Deletion rejected because dependent rows exist
    #[error("Protected: {0}")]
    Protected(String),
}
