//! Wire shapes for the sync protocol.

use serde::{Deserialize, Serialize};

use promptdeck_core::models::{EntityKind, Group, Prompt, PromptVersion};
use promptdeck_core::sync::{DeltaBatch, KindDelta, MutationOperation, PendingMutation};

/// Body of `POST /sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub last_sync_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Per-kind change bags as the server reports them.
///
/// The client treats `created` and `updated` identically (both upsert), so
/// [`ChangeSet::into_delta`] collapses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeSet<T> {
    pub created: Vec<T>,
    pub updated: Vec<T>,
    pub deleted: Vec<String>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> ChangeSet<T> {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    fn into_delta(self) -> KindDelta<T> {
        let mut upserts = self.created;
        upserts.extend(self.updated);
        KindDelta {
            upserts,
            deleted_ids: self.deleted,
        }
    }
}

/// All changes carried by one delta packet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeltaChanges {
    pub prompts: ChangeSet<Prompt>,
    pub prompt_versions: ChangeSet<PromptVersion>,
    pub groups: ChangeSet<Group>,
}

/// Response body of `POST /sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaPacket {
    pub sync_id: i64,
    pub timestamp: String,
    pub has_more: bool,
    #[serde(default)]
    pub changes: DeltaChanges,
}

impl DeltaPacket {
    /// Decode into the form the store applies: upserts plus deleted ids.
    pub fn into_batch(self) -> DeltaBatch {
        DeltaBatch {
            sync_id: self.sync_id,
            timestamp: self.timestamp,
            prompts: self.changes.prompts.into_delta(),
            prompt_versions: self.changes.prompt_versions.into_delta(),
            groups: self.changes.groups.into_delta(),
        }
    }

    /// Total number of entity changes carried by this packet.
    pub fn change_count(&self) -> usize {
        fn count<T>(set: &ChangeSet<T>) -> usize {
            set.created.len() + set.updated.len() + set.deleted.len()
        }
        count(&self.changes.prompts)
            + count(&self.changes.prompt_versions)
            + count(&self.changes.groups)
    }
}

/// One queued mutation as transmitted to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEnvelope {
    pub id: String,
    pub operation: MutationOperation,
    pub entity_type: EntityKind,
    pub entity_id: String,
    /// Partial entity for create/update; explicit `null` for delete.
    pub payload: Option<serde_json::Value>,
    pub timestamp: String,
    pub retry_count: i32,
}

impl From<PendingMutation> for MutationEnvelope {
    fn from(value: PendingMutation) -> Self {
        Self {
            id: value.id,
            operation: value.operation,
            entity_type: value.entity_kind,
            entity_id: value.entity_id,
            payload: value.payload,
            timestamp: value.created_at,
            retry_count: value.retry_count,
        }
    }
}

/// Body of `POST /mutations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub client_id: String,
    pub mutations: Vec<MutationEnvelope>,
}

/// Per-mutation outcome reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub mutation_id: String,
    pub success: bool,
    /// Server-authoritative record for a success. Deliberately not installed
    /// by the client; the next pull delivers it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body of `POST /mutations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    pub sync_id: i64,
    pub results: Vec<MutationResult>,
    /// Reserved in the schema; never produced, ignored on receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<serde_json::Value>>,
}
