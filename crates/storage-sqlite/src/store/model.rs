//! Database row models and their domain conversions.

use diesel::prelude::*;

use promptdeck_core::models::{EntityKind, Group, Prompt, PromptVersion};
use promptdeck_core::sync::{MutationOperation, PendingMutation, SyncMetadata};

use crate::errors::StoreError;

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::prompts)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PromptRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_favorite: bool,
    pub group_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub sync_id: Option<i64>,
    pub is_deleted: bool,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::prompt_versions)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PromptVersionRow {
    pub id: String,
    pub prompt_id: String,
    pub content: String,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub sync_id: Option<i64>,
    pub is_deleted: bool,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::groups)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
    pub sync_id: Option<i64>,
    pub is_deleted: bool,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::pending_mutations)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PendingMutationRow {
    pub id: String,
    pub operation: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub payload: Option<String>,
    pub created_at: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
}

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_metadata)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncMetadataRow {
    pub id: String,
    pub last_sync_id: i64,
    pub last_synced_at: Option<String>,
    pub client_id: String,
}

impl From<Prompt> for PromptRow {
    fn from(value: Prompt) -> Self {
        Self {
            id: value.id,
            title: value.title,
            content: value.content,
            category: value.category,
            is_favorite: value.is_favorite,
            group_id: value.group_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            sync_id: value.sync_id,
            is_deleted: value.is_deleted,
        }
    }
}

impl From<PromptRow> for Prompt {
    fn from(row: PromptRow) -> Self {
        Self {
            id: row.id,
            kind: EntityKind::Prompt,
            title: row.title,
            content: row.content,
            category: row.category,
            is_favorite: row.is_favorite,
            group_id: row.group_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_id: row.sync_id,
            is_deleted: row.is_deleted,
        }
    }
}

impl From<PromptVersion> for PromptVersionRow {
    fn from(value: PromptVersion) -> Self {
        Self {
            id: value.id,
            prompt_id: value.prompt_id,
            content: value.content,
            note: value.note,
            created_at: value.created_at,
            updated_at: value.updated_at,
            sync_id: value.sync_id,
            is_deleted: value.is_deleted,
        }
    }
}

impl From<PromptVersionRow> for PromptVersion {
    fn from(row: PromptVersionRow) -> Self {
        Self {
            id: row.id,
            kind: EntityKind::PromptVersion,
            prompt_id: row.prompt_id,
            content: row.content,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_id: row.sync_id,
            is_deleted: row.is_deleted,
        }
    }
}

impl From<Group> for GroupRow {
    fn from(value: Group) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
            created_at: value.created_at,
            updated_at: value.updated_at,
            sync_id: value.sync_id,
            is_deleted: value.is_deleted,
        }
    }
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            kind: EntityKind::Group,
            name: row.name,
            color: row.color,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_id: row.sync_id,
            is_deleted: row.is_deleted,
        }
    }
}

impl TryFrom<PendingMutation> for PendingMutationRow {
    type Error = StoreError;

    fn try_from(value: PendingMutation) -> Result<Self, StoreError> {
        let payload = value
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        Ok(Self {
            id: value.id,
            operation: value.operation.as_str().to_string(),
            entity_kind: value.entity_kind.as_str().to_string(),
            entity_id: value.entity_id,
            payload,
            created_at: value.created_at,
            retry_count: value.retry_count,
            last_error: value.last_error,
        })
    }
}

impl TryFrom<PendingMutationRow> for PendingMutation {
    type Error = StoreError;

    fn try_from(row: PendingMutationRow) -> Result<Self, StoreError> {
        let operation = MutationOperation::parse(&row.operation).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown mutation operation '{}'", row.operation))
        })?;
        let entity_kind = EntityKind::parse(&row.entity_kind).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown entity kind '{}'", row.entity_kind))
        })?;
        let payload = row
            .payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Self {
            id: row.id,
            operation,
            entity_kind,
            entity_id: row.entity_id,
            payload,
            created_at: row.created_at,
            retry_count: row.retry_count,
            last_error: row.last_error,
        })
    }
}

impl From<SyncMetadataRow> for SyncMetadata {
    fn from(row: SyncMetadataRow) -> Self {
        Self {
            last_sync_id: row.last_sync_id,
            last_synced_at: row.last_synced_at,
            client_id: row.client_id,
        }
    }
}
