//! The catalog store: crash-safe persistence behind a single-writer actor.
//!
//! Reads use pooled connections; every write runs on the writer thread
//! inside an immediate transaction, so each public write method is atomic
//! and durable once it returns. `apply_deltas` is all-or-nothing across the
//! three entity kinds and the metadata record.

use std::sync::Arc;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use promptdeck_core::models::{
    EntityRecord, Group, GroupPatch, Prompt, PromptPatch, PromptVersion,
};
use promptdeck_core::sync::{
    DeltaBatch, MetadataPatch, PendingMutation, SyncMetadata, SYNC_METADATA_KEY,
};

use crate::db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbPool, WriteHandle,
};
use crate::errors::Result;
use crate::schema::{groups, pending_mutations, prompt_versions, prompts, sync_metadata};

use super::model::{
    GroupRow, PendingMutationRow, PromptRow, PromptVersionRow, SyncMetadataRow,
};

fn upsert_prompt_tx(conn: &mut SqliteConnection, row: PromptRow) -> Result<()> {
    diesel::insert_into(prompts::table)
        .values(&row)
        .on_conflict(prompts::id)
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

fn upsert_version_tx(conn: &mut SqliteConnection, row: PromptVersionRow) -> Result<()> {
    diesel::insert_into(prompt_versions::table)
        .values(&row)
        .on_conflict(prompt_versions::id)
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

fn upsert_group_tx(conn: &mut SqliteConnection, row: GroupRow) -> Result<()> {
    diesel::insert_into(groups::table)
        .values(&row)
        .on_conflict(groups::id)
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(())
}

fn insert_mutation_tx(conn: &mut SqliteConnection, mutation: PendingMutation) -> Result<()> {
    let row = PendingMutationRow::try_from(mutation)?;
    diesel::insert_into(pending_mutations::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

fn upsert_record_tx(conn: &mut SqliteConnection, record: EntityRecord) -> Result<()> {
    match record {
        EntityRecord::Prompt(prompt) => upsert_prompt_tx(conn, PromptRow::from(prompt)),
        EntityRecord::PromptVersion(version) => {
            upsert_version_tx(conn, PromptVersionRow::from(version))
        }
        EntityRecord::Group(group) => upsert_group_tx(conn, GroupRow::from(group)),
    }
}

fn write_meta_tx(conn: &mut SqliteConnection, patch: MetadataPatch) -> Result<SyncMetadata> {
    let existing = sync_metadata::table
        .find(SYNC_METADATA_KEY)
        .first::<SyncMetadataRow>(conn)
        .optional()?;
    let mut meta = existing
        .map(SyncMetadata::from)
        .unwrap_or_else(|| SyncMetadata::new(""));
    if let Some(last_sync_id) = patch.last_sync_id {
        meta.last_sync_id = last_sync_id;
    }
    if let Some(last_synced_at) = patch.last_synced_at {
        meta.last_synced_at = Some(last_synced_at);
    }
    if let Some(client_id) = patch.client_id {
        meta.client_id = client_id;
    }
    let row = SyncMetadataRow {
        id: SYNC_METADATA_KEY.to_string(),
        last_sync_id: meta.last_sync_id,
        last_synced_at: meta.last_synced_at.clone(),
        client_id: meta.client_id.clone(),
    };
    diesel::insert_into(sync_metadata::table)
        .values(&row)
        .on_conflict(sync_metadata::id)
        .do_update()
        .set(&row)
        .execute(conn)?;
    Ok(meta)
}

/// The durable store.
pub struct CatalogStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CatalogStore {
    /// Open (or create) the database at `db_path`, run migrations, and spawn
    /// the writer.
    pub fn open(db_path: &str) -> Result<Self> {
        let pool = create_pool(db_path)?;
        {
            let mut conn = get_connection(&pool)?;
            run_migrations(&mut conn)?;
        }
        let writer = spawn_writer(pool.as_ref().clone());
        Ok(Self { pool, writer })
    }

    /// Convenience: resolve the database file inside `app_data_dir` and open.
    pub fn open_in_dir(app_data_dir: &str) -> Result<Self> {
        let db_path = init(app_data_dir)?;
        Self::open(&db_path)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Entities
    // ─────────────────────────────────────────────────────────────────────

    pub async fn put_prompt(&self, prompt: Prompt) -> Result<()> {
        self.writer
            .exec(move |conn| upsert_prompt_tx(conn, PromptRow::from(prompt)))
            .await
    }

    pub async fn bulk_put_prompts(&self, items: Vec<Prompt>) -> Result<()> {
        self.writer
            .exec(move |conn| {
                for prompt in items {
                    upsert_prompt_tx(conn, PromptRow::from(prompt))?;
                }
                Ok(())
            })
            .await
    }

    /// Merge a patch into an existing prompt. Returns `None` (and writes
    /// nothing) when the id is unknown.
    pub async fn update_prompt(
        &self,
        prompt_id: String,
        patch: PromptPatch,
    ) -> Result<Option<Prompt>> {
        self.writer
            .exec(move |conn| {
                let existing = prompts::table
                    .find(&prompt_id)
                    .first::<PromptRow>(conn)
                    .optional()?;
                let Some(row) = existing else {
                    return Ok(None);
                };
                let mut prompt = Prompt::from(row);
                prompt.apply_patch(&patch);
                upsert_prompt_tx(conn, PromptRow::from(prompt.clone()))?;
                Ok(Some(prompt))
            })
            .await
    }

    pub fn get_prompt(&self, prompt_id: &str) -> Result<Option<Prompt>> {
        let mut conn = get_connection(&self.pool)?;
        let row = prompts::table
            .find(prompt_id)
            .first::<PromptRow>(&mut conn)
            .optional()?;
        Ok(row.map(Prompt::from))
    }

    /// Prompts whose soft-delete flag is not set.
    pub fn active_prompts(&self) -> Result<Vec<Prompt>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = prompts::table
            .filter(prompts::is_deleted.eq(false))
            .load::<PromptRow>(&mut conn)?;
        Ok(rows.into_iter().map(Prompt::from).collect())
    }

    pub async fn put_prompt_version(&self, version: PromptVersion) -> Result<()> {
        self.writer
            .exec(move |conn| upsert_version_tx(conn, PromptVersionRow::from(version)))
            .await
    }

    pub async fn bulk_put_prompt_versions(&self, items: Vec<PromptVersion>) -> Result<()> {
        self.writer
            .exec(move |conn| {
                for version in items {
                    upsert_version_tx(conn, PromptVersionRow::from(version))?;
                }
                Ok(())
            })
            .await
    }

    pub fn get_prompt_version(&self, version_id: &str) -> Result<Option<PromptVersion>> {
        let mut conn = get_connection(&self.pool)?;
        let row = prompt_versions::table
            .find(version_id)
            .first::<PromptVersionRow>(&mut conn)
            .optional()?;
        Ok(row.map(PromptVersion::from))
    }

    pub fn active_prompt_versions(&self) -> Result<Vec<PromptVersion>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = prompt_versions::table
            .filter(prompt_versions::is_deleted.eq(false))
            .load::<PromptVersionRow>(&mut conn)?;
        Ok(rows.into_iter().map(PromptVersion::from).collect())
    }

    /// Non-deleted versions of one prompt, newest first.
    pub fn versions_of(&self, prompt_id: &str) -> Result<Vec<PromptVersion>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = prompt_versions::table
            .filter(prompt_versions::prompt_id.eq(prompt_id))
            .filter(prompt_versions::is_deleted.eq(false))
            .order((
                prompt_versions::created_at.desc(),
                prompt_versions::id.desc(),
            ))
            .load::<PromptVersionRow>(&mut conn)?;
        Ok(rows.into_iter().map(PromptVersion::from).collect())
    }

    pub async fn put_group(&self, group: Group) -> Result<()> {
        self.writer
            .exec(move |conn| upsert_group_tx(conn, GroupRow::from(group)))
            .await
    }

    pub async fn bulk_put_groups(&self, items: Vec<Group>) -> Result<()> {
        self.writer
            .exec(move |conn| {
                for group in items {
                    upsert_group_tx(conn, GroupRow::from(group))?;
                }
                Ok(())
            })
            .await
    }

    /// Merge a patch into an existing group. `None` when the id is unknown.
    pub async fn update_group(
        &self,
        group_id: String,
        patch: GroupPatch,
    ) -> Result<Option<Group>> {
        self.writer
            .exec(move |conn| {
                let existing = groups::table
                    .find(&group_id)
                    .first::<GroupRow>(conn)
                    .optional()?;
                let Some(row) = existing else {
                    return Ok(None);
                };
                let mut group = Group::from(row);
                group.apply_patch(&patch);
                upsert_group_tx(conn, GroupRow::from(group.clone()))?;
                Ok(Some(group))
            })
            .await
    }

    pub fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        let mut conn = get_connection(&self.pool)?;
        let row = groups::table
            .find(group_id)
            .first::<GroupRow>(&mut conn)
            .optional()?;
        Ok(row.map(Group::from))
    }

    pub fn active_groups(&self) -> Result<Vec<Group>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = groups::table
            .filter(groups::is_deleted.eq(false))
            .load::<GroupRow>(&mut conn)?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    /// Persist an optimistically-applied entity and its queued mutation in
    /// one transaction, so the edit and its pending record are durable
    /// together.
    pub async fn persist_with_mutation(
        &self,
        record: EntityRecord,
        mutation: PendingMutation,
    ) -> Result<()> {
        self.writer
            .exec(move |conn| {
                upsert_record_tx(conn, record)?;
                insert_mutation_tx(conn, mutation)
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pending-mutation queue
    // ─────────────────────────────────────────────────────────────────────

    pub async fn enqueue_mutation(&self, mutation: PendingMutation) -> Result<()> {
        self.writer
            .exec(move |conn| insert_mutation_tx(conn, mutation))
            .await
    }

    /// Remove a queued mutation. Returns whether a record was removed.
    pub async fn dequeue_mutation(&self, mutation_id: String) -> Result<bool> {
        self.writer
            .exec(move |conn| {
                let affected =
                    diesel::delete(pending_mutations::table.find(&mutation_id)).execute(conn)?;
                Ok(affected > 0)
            })
            .await
    }

    /// Record a retry attempt on a queued mutation.
    pub async fn update_mutation(
        &self,
        mutation_id: String,
        retry_count: i32,
        last_error: Option<String>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(pending_mutations::table.find(&mutation_id))
                    .set((
                        pending_mutations::retry_count.eq(retry_count),
                        pending_mutations::last_error.eq(last_error),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    /// Pending mutations in FIFO order (creation stamp, then id), optionally
    /// capped.
    pub fn drain_ordered(&self, limit: Option<i64>) -> Result<Vec<PendingMutation>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = pending_mutations::table
            .order((
                pending_mutations::created_at.asc(),
                pending_mutations::id.asc(),
            ))
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let rows = query.load::<PendingMutationRow>(&mut conn)?;
        rows.into_iter().map(PendingMutation::try_from).collect()
    }

    pub fn get_mutation(&self, mutation_id: &str) -> Result<Option<PendingMutation>> {
        let mut conn = get_connection(&self.pool)?;
        let row = pending_mutations::table
            .find(mutation_id)
            .first::<PendingMutationRow>(&mut conn)
            .optional()?;
        row.map(PendingMutation::try_from).transpose()
    }

    pub fn pending_count(&self) -> Result<i64> {
        use diesel::dsl::count_star;
        let mut conn = get_connection(&self.pool)?;
        Ok(pending_mutations::table
            .select(count_star())
            .first(&mut conn)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sync metadata
    // ─────────────────────────────────────────────────────────────────────

    pub fn read_meta(&self) -> Result<Option<SyncMetadata>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_metadata::table
            .find(SYNC_METADATA_KEY)
            .first::<SyncMetadataRow>(&mut conn)
            .optional()?;
        Ok(row.map(SyncMetadata::from))
    }

    /// Upsert-merge the metadata singleton and return the merged record.
    pub async fn write_meta(&self, patch: MetadataPatch) -> Result<SyncMetadata> {
        self.writer
            .exec(move |conn| write_meta_tx(conn, patch))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Delta application and reset
    // ─────────────────────────────────────────────────────────────────────

    /// Apply one pull packet: upsert every carried entity, set the
    /// soft-delete flag for listed ids (absent ids are skipped; no record is
    /// synthesized to hold the flag), and advance the cursor. All or
    /// nothing, and the cursor never goes backward.
    pub async fn apply_deltas(&self, batch: DeltaBatch) -> Result<()> {
        self.writer
            .exec(move |conn| {
                for prompt in batch.prompts.upserts {
                    upsert_prompt_tx(conn, PromptRow::from(prompt))?;
                }
                if !batch.prompts.deleted_ids.is_empty() {
                    diesel::update(
                        prompts::table
                            .filter(prompts::id.eq_any(&batch.prompts.deleted_ids)),
                    )
                    .set(prompts::is_deleted.eq(true))
                    .execute(conn)?;
                }

                for version in batch.prompt_versions.upserts {
                    upsert_version_tx(conn, PromptVersionRow::from(version))?;
                }
                if !batch.prompt_versions.deleted_ids.is_empty() {
                    diesel::update(
                        prompt_versions::table
                            .filter(prompt_versions::id.eq_any(&batch.prompt_versions.deleted_ids)),
                    )
                    .set(prompt_versions::is_deleted.eq(true))
                    .execute(conn)?;
                }

                for group in batch.groups.upserts {
                    upsert_group_tx(conn, GroupRow::from(group))?;
                }
                if !batch.groups.deleted_ids.is_empty() {
                    diesel::update(
                        groups::table.filter(groups::id.eq_any(&batch.groups.deleted_ids)),
                    )
                    .set(groups::is_deleted.eq(true))
                    .execute(conn)?;
                }

                let current_cursor = sync_metadata::table
                    .find(SYNC_METADATA_KEY)
                    .first::<SyncMetadataRow>(conn)
                    .optional()?
                    .map(|row| row.last_sync_id)
                    .unwrap_or(0);
                if batch.sync_id > current_cursor {
                    write_meta_tx(
                        conn,
                        MetadataPatch::cursor(batch.sync_id, batch.timestamp),
                    )?;
                }
                Ok(())
            })
            .await
    }

    /// Remove every record in every namespace. Used for logout/reset.
    pub async fn clear_all(&self) -> Result<()> {
        self.writer
            .exec(|conn| {
                diesel::delete(prompts::table).execute(conn)?;
                diesel::delete(prompt_versions::table).execute(conn)?;
                diesel::delete(groups::table).execute(conn)?;
                diesel::delete(pending_mutations::table).execute(conn)?;
                diesel::delete(sync_metadata::table).execute(conn)?;
                Ok(())
            })
            .await
    }
}
