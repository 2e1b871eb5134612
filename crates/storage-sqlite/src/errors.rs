//! Error types for the storage crate.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Serialization error for queued payloads
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted record failed to decode back into its domain type
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The writer actor has shut down
    #[error("Write actor unavailable")]
    WriterUnavailable,

    /// Filesystem error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
