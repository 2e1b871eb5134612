//! Prompt version model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_false, EntityKind};
use crate::time::now_rfc3339;

fn version_kind() -> EntityKind {
    EntityKind::PromptVersion
}

/// An immutable snapshot of a prompt's content.
///
/// Versions reference their prompt by id and may outlive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptVersion {
    pub id: String,
    #[serde(rename = "type", default = "version_kind")]
    pub kind: EntityKind,
    pub prompt_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
}

/// Version fields excluding the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromptVersion {
    pub prompt_id: String,
    pub content: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl PromptVersion {
    /// Mint a new version with a random id and fresh timestamps.
    pub fn create(fields: NewPromptVersion) -> Self {
        let now = now_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            kind: EntityKind::PromptVersion,
            prompt_id: fields.prompt_id,
            content: fields.content,
            note: fields.note,
            created_at: now.clone(),
            updated_at: now,
            sync_id: None,
            is_deleted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_type_discriminator_is_prompt_version() {
        let version = PromptVersion::create(NewPromptVersion {
            prompt_id: "P".to_string(),
            content: "body".to_string(),
            note: Some("first".to_string()),
        });
        let json = serde_json::to_value(&version).expect("serialize version");
        assert_eq!(json["type"], "prompt_version");
        assert_eq!(json["promptId"], "P");
        assert_eq!(json["note"], "first");
    }
}
