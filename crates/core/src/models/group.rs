//! Group model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{is_false, EntityKind};
use crate::time::now_rfc3339;

fn group_kind() -> EntityKind {
    EntityKind::Group
}

/// A named, colored grouping of prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(rename = "type", default = "group_kind")]
    pub kind: EntityKind,
    pub name: String,
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
}

/// Group fields excluding the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// Partial group fields, also the payload of an `update` mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Group {
    /// Mint a new group with a random id and fresh timestamps.
    pub fn create(fields: NewGroup) -> Self {
        let now = now_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            kind: EntityKind::Group,
            name: fields.name,
            color: fields.color,
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

    /// Merge a patch into this group and refresh `updated_at`.
    pub fn apply_patch(&mut self, patch: &GroupPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_type_discriminator_is_group() {
        let group = Group::create(NewGroup {
            name: "g".to_string(),
            color: "red".to_string(),
        });
        let json = serde_json::to_value(&group).expect("serialize group");
        assert_eq!(json["type"], "group");
        assert_eq!(json["name"], "g");
    }

    #[test]
    fn empty_patch_touches_update_stamp_only() {
        let mut group = Group::create(NewGroup {
            name: "g".to_string(),
            color: "red".to_string(),
        });
        let before = group.clone();
        group.apply_patch(&GroupPatch::default());
        assert_eq!(group.name, before.name);
        assert_eq!(group.color, before.color);
        assert!(group.updated_at >= before.updated_at);
    }
}
