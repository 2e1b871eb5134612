//! Prompt model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_false, EntityKind};
use crate::time::now_rfc3339;

fn prompt_kind() -> EntityKind {
    EntityKind::Prompt
}

/// A user-authored prompt.
///
/// `group_id` may reference a [`super::Group`] by id; referential integrity
/// is not enforced and a dangling reference is a valid state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    #[serde(rename = "type", default = "prompt_kind")]
    pub kind: EntityKind,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
}

/// Prompt fields excluding the envelope, used when minting a new record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Partial prompt fields. Doubles as the payload of an `update` mutation.
///
/// `group_id` is doubly optional: `Some(None)` clears the group assignment
/// and serializes as an explicit `"groupId": null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Option<String>>,
}

impl Prompt {
    /// Mint a new prompt with a random id and fresh timestamps.
    pub fn create(fields: NewPrompt) -> Self {
        let now = now_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            kind: EntityKind::Prompt,
            title: fields.title,
            content: fields.content,
            category: fields.category,
            is_favorite: fields.is_favorite,
            group_id: fields.group_id,
            created_at: now.clone(),
            updated_at: now,
            sync_id: None,
            is_deleted: false,
        }
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }

    /// Merge a patch into this prompt and refresh `updated_at`.
    ///
    /// An empty patch is a no-op on field values but still touches the
    /// update stamp.
    pub fn apply_patch(&mut self, patch: &PromptPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(group_id) = &patch.group_id {
            self.group_id = group_id.clone();
        }
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_mints_id_and_stamps() {
        let prompt = Prompt::create(NewPrompt {
            title: "T".to_string(),
            content: "C".to_string(),
            ..Default::default()
        });
        assert!(!prompt.id.is_empty());
        assert_eq!(prompt.created_at, prompt.updated_at);
        assert!(!prompt.is_deleted);
        assert_eq!(prompt.sync_id, None);
    }

    #[test]
    fn ids_are_unique() {
        let a = Prompt::create(NewPrompt::default());
        let b = Prompt::create(NewPrompt::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn patch_merges_supplied_fields_only() {
        let mut prompt = Prompt::create(NewPrompt {
            title: "old".to_string(),
            content: "body".to_string(),
            group_id: Some("g1".to_string()),
            ..Default::default()
        });
        prompt.apply_patch(&PromptPatch {
            title: Some("new".to_string()),
            is_favorite: Some(true),
            ..Default::default()
        });
        assert_eq!(prompt.title, "new");
        assert_eq!(prompt.content, "body");
        assert!(prompt.is_favorite);
        assert_eq!(prompt.group_id.as_deref(), Some("g1"));
    }

    #[test]
    fn patch_can_clear_group() {
        let mut prompt = Prompt::create(NewPrompt {
            group_id: Some("g1".to_string()),
            ..Default::default()
        });
        prompt.apply_patch(&PromptPatch {
            group_id: Some(None),
            ..Default::default()
        });
        assert_eq!(prompt.group_id, None);
    }

    #[test]
    fn patch_group_clear_serializes_as_null() {
        let patch = PromptPatch {
            group_id: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).expect("serialize patch");
        assert_eq!(json, serde_json::json!({ "groupId": null }));
    }

    #[test]
    fn wire_shape_uses_camel_case_and_type_discriminator() {
        let mut prompt = Prompt::create(NewPrompt {
            title: "T".to_string(),
            ..Default::default()
        });
        prompt.sync_id = Some(7);
        let json = serde_json::to_value(&prompt).expect("serialize prompt");
        assert_eq!(json["type"], "prompt");
        assert_eq!(json["isFavorite"], false);
        assert_eq!(json["syncId"], 7);
        assert!(json.get("isDeleted").is_none(), "flag omitted when unset");
        assert!(json.get("groupId").is_none());
    }

    #[test]
    fn deserializes_without_optional_envelope_fields() {
        let prompt: Prompt = serde_json::from_value(serde_json::json!({
            "id": "A",
            "type": "prompt",
            "title": "a",
            "content": "",
            "category": "",
            "isFavorite": false,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .expect("deserialize prompt");
        assert_eq!(prompt.sync_id, None);
        assert!(!prompt.is_deleted);
    }
}
