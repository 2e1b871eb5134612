//! Pending mutation record: a local edit queued for transmission.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EntityKind;
use crate::time::now_rfc3339;

/// Mutation ids are UUIDv7 minted through one shared context, so they are
/// monotonic even within a single millisecond. Lexical order on ids then
/// breaks FIFO ties between mutations sharing a creation stamp.
fn next_mutation_id() -> String {
    Uuid::now_v7().to_string()
}

/// Supported mutation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOperation {
    Create,
    Update,
    Delete,
}

impl MutationOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOperation::Create => "create",
            MutationOperation::Update => "update",
            MutationOperation::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(MutationOperation::Create),
            "update" => Some(MutationOperation::Update),
            "delete" => Some(MutationOperation::Delete),
            _ => None,
        }
    }
}

/// A user-initiated change applied optimistically to the local replica and
/// queued for eventual transmission to the server.
///
/// The record stays in the durable queue until the server acknowledges it
/// (success or permanent failure after the retry budget is exhausted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    pub id: String,
    pub operation: MutationOperation,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    /// Partial entity for create/update; absent for delete.
    pub payload: Option<serde_json::Value>,
    pub created_at: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
}

impl PendingMutation {
    /// Mint a queue record for a local mutation.
    pub fn new(
        operation: MutationOperation,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: next_mutation_id(),
            operation,
            entity_kind,
            entity_id: entity_id.into(),
            payload,
            created_at: now_rfc3339(),
            retry_count: 0,
            last_error: None,
        }
    }
}
