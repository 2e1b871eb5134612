//! Sync metadata singleton: cursor position and device identity.

use serde::{Deserialize, Serialize};

/// Key of the single metadata record in the durable store.
pub const SYNC_METADATA_KEY: &str = "sync_metadata";

/// The client's position against the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Last cursor value successfully consumed. Monotonically non-decreasing.
    pub last_sync_id: i64,
    /// RFC3339 stamp of the last successful pull.
    pub last_synced_at: Option<String>,
    /// Per-device identity sent with every mutation batch.
    pub client_id: String,
}

impl SyncMetadata {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            last_sync_id: 0,
            last_synced_at: None,
            client_id: client_id.into(),
        }
    }
}

/// Partial metadata update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub last_sync_id: Option<i64>,
    pub last_synced_at: Option<String>,
    pub client_id: Option<String>,
}

impl MetadataPatch {
    pub fn cursor(last_sync_id: i64, last_synced_at: impl Into<String>) -> Self {
        Self {
            last_sync_id: Some(last_sync_id),
            last_synced_at: Some(last_synced_at.into()),
            client_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metadata_starts_at_cursor_zero() {
        let meta = SyncMetadata::new("client-1");
        assert_eq!(meta.last_sync_id, 0);
        assert_eq!(meta.last_synced_at, None);
        assert_eq!(meta.client_id, "client-1");
    }
}
