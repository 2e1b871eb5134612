//! Error types for the engine crate.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the view or the sync engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Durable store failure
    #[error("Store error: {0}")]
    Store(#[from] promptdeck_storage_sqlite::StoreError),

    /// Transport-level sync API failure
    #[error("Sync API error: {0}")]
    Api(#[from] promptdeck_sync_client::SyncApiError),

    /// Payload serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
