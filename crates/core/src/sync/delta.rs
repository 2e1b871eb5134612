//! Decoded delta shapes applied to the replica.
//!
//! The wire format separates `created` and `updated`, but the client treats
//! both as upserts, so the decoded form collapses them into one list per
//! kind. Soft deletes stay as bare ids.

use crate::models::{Group, Prompt, PromptVersion};

/// Net changes for one entity kind.
#[derive(Debug, Clone)]
pub struct KindDelta<T> {
    pub upserts: Vec<T>,
    pub deleted_ids: Vec<String>,
}

impl<T> Default for KindDelta<T> {
    fn default() -> Self {
        Self {
            upserts: Vec::new(),
            deleted_ids: Vec::new(),
        }
    }
}

impl<T> KindDelta<T> {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deleted_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deleted_ids.len()
    }
}

/// One pull packet, decoded: the new cursor, its server stamp, and the net
/// changes per kind. Applied all-or-nothing by the store.
#[derive(Debug, Clone, Default)]
pub struct DeltaBatch {
    pub sync_id: i64,
    pub timestamp: String,
    pub prompts: KindDelta<Prompt>,
    pub prompt_versions: KindDelta<PromptVersion>,
    pub groups: KindDelta<Group>,
}

impl DeltaBatch {
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty() && self.prompt_versions.is_empty() && self.groups.is_empty()
    }

    /// Total number of entity changes carried by this batch.
    pub fn change_count(&self) -> usize {
        self.prompts.len() + self.prompt_versions.len() + self.groups.len()
    }
}
