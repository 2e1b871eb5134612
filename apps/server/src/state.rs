//! In-memory authority state.
//!
//! Entities are stored as raw JSON objects tagged with the cursor positions
//! of their first and latest writes. The cursor (`sync_id`) advances by one
//! for every persistent write; reads derive "effective net changes" from the
//! per-entity `last_seq` markers, so a burst of writes to one entity
//! collapses into its latest state.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// Default page size for the sync endpoint.
pub const DEFAULT_SYNC_LIMIT: i64 = 100;

/// One stored entity: its latest JSON value plus write bookkeeping.
#[derive(Debug, Clone)]
pub struct StoredEntity {
    pub value: Value,
    pub first_seq: i64,
    pub last_seq: i64,
    pub deleted: bool,
}

/// The three entity namespaces plus the write counter.
#[derive(Debug, Default)]
pub struct AuthorityState {
    pub sync_id: i64,
    pub prompts: HashMap<String, StoredEntity>,
    pub prompt_versions: HashMap<String, StoredEntity>,
    pub groups: HashMap<String, StoredEntity>,
}

/// Per-kind change bags in wire form.
#[derive(Debug, Default)]
pub struct KindChanges {
    pub created: Vec<Value>,
    pub updated: Vec<Value>,
    pub deleted: Vec<String>,
}

/// Net changes since a cursor, plus the advanced cursor and truncation flag.
#[derive(Debug, Default)]
pub struct CollectedChanges {
    pub sync_id: i64,
    pub has_more: bool,
    pub prompts: KindChanges,
    pub prompt_versions: KindChanges,
    pub groups: KindChanges,
}

/// Outcome of applying one mutation.
#[derive(Debug)]
pub struct AppliedMutation {
    pub success: bool,
    pub entity: Option<Value>,
    pub error: Option<String>,
}

impl AppliedMutation {
    fn ok(entity: Option<Value>) -> Self {
        Self {
            success: true,
            entity,
            error: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            entity: None,
            error: Some(message.into()),
        }
    }
}

impl AuthorityState {
    fn kind_map(&mut self, entity_type: &str) -> Option<&mut HashMap<String, StoredEntity>> {
        match entity_type {
            "prompt" => Some(&mut self.prompts),
            "prompt_version" => Some(&mut self.prompt_versions),
            "group" => Some(&mut self.groups),
            _ => None,
        }
    }

    /// Apply one client mutation against the current state.
    ///
    /// Unknown entity kinds and operations are per-mutation failures, never
    /// batch failures. The cursor only advances when something was written.
    pub fn apply_mutation(
        &mut self,
        operation: &str,
        entity_type: &str,
        entity_id: &str,
        payload: Option<&Value>,
    ) -> AppliedMutation {
        let next_seq = self.sync_id + 1;
        let Some(map) = self.kind_map(entity_type) else {
            return AppliedMutation::fail(format!("unknown entity type '{entity_type}'"));
        };

        match operation {
            "create" => {
                let Some(payload) = payload.and_then(Value::as_object) else {
                    return AppliedMutation::fail("create requires an object payload");
                };
                let mut value = Value::Object(payload.clone());
                value["id"] = Value::String(entity_id.to_string());
                value["type"] = Value::String(entity_type.to_string());
                value["syncId"] = Value::from(next_seq);
                // A create for a soft-deleted id resurrects it; the server
                // is authoritative.
                if let Some(object) = value.as_object_mut() {
                    object.remove("isDeleted");
                }
                let first_seq = map.get(entity_id).map(|e| e.first_seq).unwrap_or(next_seq);
                map.insert(
                    entity_id.to_string(),
                    StoredEntity {
                        value: value.clone(),
                        first_seq,
                        last_seq: next_seq,
                        deleted: false,
                    },
                );
                self.sync_id = next_seq;
                AppliedMutation::ok(Some(value))
            }
            "update" => {
                let Some(payload) = payload.and_then(Value::as_object) else {
                    return AppliedMutation::fail("update requires an object payload");
                };
                let Some(entity) = map.get_mut(entity_id) else {
                    return AppliedMutation::fail(format!("unknown entity '{entity_id}'"));
                };
                if let Some(object) = entity.value.as_object_mut() {
                    for (key, value) in payload {
                        object.insert(key.clone(), value.clone());
                    }
                }
                entity.value["syncId"] = Value::from(next_seq);
                entity.last_seq = next_seq;
                let result = entity.value.clone();
                self.sync_id = next_seq;
                AppliedMutation::ok(Some(result))
            }
            "delete" => {
                let Some(entity) = map.get_mut(entity_id) else {
                    // Idempotent: deleting an unknown id succeeds without a
                    // persistent write, so the cursor stays put.
                    return AppliedMutation::ok(None);
                };
                entity.deleted = true;
                entity.value["isDeleted"] = Value::Bool(true);
                entity.value["syncId"] = Value::from(next_seq);
                entity.last_seq = next_seq;
                let result = entity.value.clone();
                self.sync_id = next_seq;
                AppliedMutation::ok(Some(result))
            }
            other => AppliedMutation::fail(format!("unknown operation '{other}'")),
        }
    }

    /// Effective net changes since `last_sync_id`, in cursor order, capped
    /// at `limit`.
    pub fn collect_changes(&self, last_sync_id: i64, limit: Option<i64>) -> CollectedChanges {
        let limit = match limit {
            Some(value) if value > 0 => value as usize,
            _ => DEFAULT_SYNC_LIMIT as usize,
        };

        let mut touched: Vec<(&'static str, &String, &StoredEntity)> = Vec::new();
        for (kind, map) in [
            ("prompt", &self.prompts),
            ("prompt_version", &self.prompt_versions),
            ("group", &self.groups),
        ] {
            for (id, entity) in map {
                if entity.last_seq > last_sync_id {
                    touched.push((kind, id, entity));
                }
            }
        }
        touched.sort_by_key(|(_, _, entity)| entity.last_seq);

        let has_more = touched.len() > limit;
        touched.truncate(limit);

        let mut collected = CollectedChanges {
            sync_id: touched
                .last()
                .map(|(_, _, entity)| entity.last_seq)
                .unwrap_or(last_sync_id),
            has_more,
            ..Default::default()
        };

        for (kind, id, entity) in touched {
            let bag = match kind {
                "prompt" => &mut collected.prompts,
                "prompt_version" => &mut collected.prompt_versions,
                _ => &mut collected.groups,
            };
            if entity.deleted {
                bag.deleted.push(id.clone());
            } else if entity.first_seq > last_sync_id {
                bag.created.push(entity.value.clone());
            } else {
                bag.updated.push(entity.value.clone());
            }
        }

        collected
    }
}

/// Shared, lockable authority.
#[derive(Debug, Default)]
pub struct Authority {
    pub state: Mutex<AuthorityState>,
}
