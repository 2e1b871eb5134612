//! The projected view: an in-memory projection of the durable store.
//!
//! Reads never touch the database or the network; they are snapshots of the
//! in-memory maps. Local mutations apply to the view first (optimistic
//! visibility), then persist the entity and its queued mutation in a single
//! store transaction. Soft-deleted records stay in the maps with the flag
//! set and are filtered out of the selectors.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use promptdeck_core::models::{
    EntityKind, EntityRecord, Group, GroupPatch, NewGroup, NewPrompt, NewPromptVersion, Prompt,
    PromptPatch, PromptVersion,
};
use promptdeck_core::sync::{
    DeltaBatch, MutationOperation, PendingMutation, StatusPatch, SyncStatus,
};
use promptdeck_storage_sqlite::CatalogStore;

use crate::errors::Result;

#[derive(Default)]
struct ViewState {
    prompts: HashMap<String, Prompt>,
    prompt_versions: HashMap<String, PromptVersion>,
    groups: HashMap<String, Group>,
    status: SyncStatus,
    ready: bool,
}

/// In-memory projection of the catalog, plus the sync status record.
pub struct CatalogView {
    store: Arc<CatalogStore>,
    state: RwLock<ViewState>,
    revision: watch::Sender<u64>,
}

impl CatalogView {
    pub fn new(store: Arc<CatalogStore>) -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            store,
            state: RwLock::new(ViewState::default()),
            revision,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewState> {
        self.state.read().expect("catalog view lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewState> {
        self.state.write().expect("catalog view lock poisoned")
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Observe changes: the receiver's value increments on every view change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Selectors
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.read().ready
    }

    /// Non-deleted prompts, most recently updated first.
    pub fn active_prompts(&self) -> Vec<Prompt> {
        let state = self.read();
        let mut prompts: Vec<Prompt> = state
            .prompts
            .values()
            .filter(|prompt| !prompt.is_deleted)
            .cloned()
            .collect();
        prompts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        prompts
    }

    /// Non-deleted groups, by name.
    pub fn active_groups(&self) -> Vec<Group> {
        let state = self.read();
        let mut groups: Vec<Group> = state
            .groups
            .values()
            .filter(|group| !group.is_deleted)
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        groups
    }

    /// Non-deleted prompt versions across all prompts.
    pub fn active_prompt_versions(&self) -> Vec<PromptVersion> {
        let state = self.read();
        let mut versions: Vec<PromptVersion> = state
            .prompt_versions
            .values()
            .filter(|version| !version.is_deleted)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        versions
    }

    /// Non-deleted prompts with the favorite flag set.
    pub fn favorite_prompts(&self) -> Vec<Prompt> {
        self.active_prompts()
            .into_iter()
            .filter(|prompt| prompt.is_favorite)
            .collect()
    }

    /// Non-deleted prompts assigned to a group.
    pub fn prompts_in_group(&self, group_id: &str) -> Vec<Prompt> {
        self.active_prompts()
            .into_iter()
            .filter(|prompt| prompt.group_id.as_deref() == Some(group_id))
            .collect()
    }

    /// Non-deleted versions of one prompt, newest first.
    pub fn versions_of(&self, prompt_id: &str) -> Vec<PromptVersion> {
        self.active_prompt_versions()
            .into_iter()
            .filter(|version| version.prompt_id == prompt_id)
            .collect()
    }

    /// A single prompt by id, soft-deleted or not.
    pub fn prompt(&self, prompt_id: &str) -> Option<Prompt> {
        self.read().prompts.get(prompt_id).cloned()
    }

    /// A single group by id, soft-deleted or not.
    pub fn group(&self, group_id: &str) -> Option<Group> {
        self.read().groups.get(group_id).cloned()
    }

    /// Snapshot of the sync status record.
    pub fn status(&self) -> SyncStatus {
        self.read().status.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation operations
    // ─────────────────────────────────────────────────────────────────────

    /// Persist an optimistic edit and its queue record in one transaction.
    ///
    /// A store failure leaves the view in its optimistic state: the status
    /// turns to error and the next successful pull reconciles.
    async fn persist_optimistic(&self, record: EntityRecord, mutation: PendingMutation) {
        if let Err(err) = self.store.persist_with_mutation(record, mutation).await {
            log::error!("[Sync] optimistic write failed to persist: {err}");
            self.refresh_pending_count();
            self.update_sync_status(StatusPatch::error(err.to_string()));
        }
    }

    fn refresh_pending_count(&self) {
        if let Ok(count) = self.store.pending_count() {
            let mut state = self.write();
            state.status.pending_count = count as usize;
        }
    }

    pub async fn create_prompt(&self, fields: NewPrompt) -> Result<Prompt> {
        let prompt = Prompt::create(fields);
        let payload = serde_json::to_value(&prompt)?;
        {
            let mut state = self.write();
            state.prompts.insert(prompt.id.clone(), prompt.clone());
            state.status.pending_count += 1;
        }
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Create,
            EntityKind::Prompt,
            prompt.id.clone(),
            Some(payload),
        );
        self.persist_optimistic(prompt.clone().into(), mutation).await;
        Ok(prompt)
    }

    /// No-op when the id is unknown.
    pub async fn update_prompt(&self, prompt_id: &str, patch: PromptPatch) -> Result<()> {
        let merged = {
            let mut state = self.write();
            let Some(prompt) = state.prompts.get_mut(prompt_id) else {
                return Ok(());
            };
            prompt.apply_patch(&patch);
            let merged = prompt.clone();
            state.status.pending_count += 1;
            merged
        };
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Update,
            EntityKind::Prompt,
            prompt_id,
            Some(serde_json::to_value(&patch)?),
        );
        self.persist_optimistic(merged.into(), mutation).await;
        Ok(())
    }

    /// Soft delete; no-op when the id is unknown.
    pub async fn delete_prompt(&self, prompt_id: &str) -> Result<()> {
        let flagged = {
            let mut state = self.write();
            let Some(prompt) = state.prompts.get_mut(prompt_id) else {
                return Ok(());
            };
            prompt.is_deleted = true;
            prompt.touch();
            let flagged = prompt.clone();
            state.status.pending_count += 1;
            flagged
        };
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Delete,
            EntityKind::Prompt,
            prompt_id,
            None,
        );
        self.persist_optimistic(flagged.into(), mutation).await;
        Ok(())
    }

    pub async fn create_group(&self, fields: NewGroup) -> Result<Group> {
        let group = Group::create(fields);
        let payload = serde_json::to_value(&group)?;
        {
            let mut state = self.write();
            state.groups.insert(group.id.clone(), group.clone());
            state.status.pending_count += 1;
        }
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Create,
            EntityKind::Group,
            group.id.clone(),
            Some(payload),
        );
        self.persist_optimistic(group.clone().into(), mutation).await;
        Ok(group)
    }

    /// No-op when the id is unknown.
    pub async fn update_group(&self, group_id: &str, patch: GroupPatch) -> Result<()> {
        let merged = {
            let mut state = self.write();
            let Some(group) = state.groups.get_mut(group_id) else {
                return Ok(());
            };
            group.apply_patch(&patch);
            let merged = group.clone();
            state.status.pending_count += 1;
            merged
        };
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Update,
            EntityKind::Group,
            group_id,
            Some(serde_json::to_value(&patch)?),
        );
        self.persist_optimistic(merged.into(), mutation).await;
        Ok(())
    }

    /// Soft delete; no-op when the id is unknown.
    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        let flagged = {
            let mut state = self.write();
            let Some(group) = state.groups.get_mut(group_id) else {
                return Ok(());
            };
            group.is_deleted = true;
            group.touch();
            let flagged = group.clone();
            state.status.pending_count += 1;
            flagged
        };
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Delete,
            EntityKind::Group,
            group_id,
            None,
        );
        self.persist_optimistic(flagged.into(), mutation).await;
        Ok(())
    }

    pub async fn create_prompt_version(&self, fields: NewPromptVersion) -> Result<PromptVersion> {
        let version = PromptVersion::create(fields);
        let payload = serde_json::to_value(&version)?;
        {
            let mut state = self.write();
            state
                .prompt_versions
                .insert(version.id.clone(), version.clone());
            state.status.pending_count += 1;
        }
        self.bump();
        let mutation = PendingMutation::new(
            MutationOperation::Create,
            EntityKind::PromptVersion,
            version.id.clone(),
            Some(payload),
        );
        self.persist_optimistic(version.clone().into(), mutation).await;
        Ok(version)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sync-engine-facing operations
    // ─────────────────────────────────────────────────────────────────────

    /// Install one pull packet: server values overwrite the view (server
    /// wins at the entity level), soft deletes set the flag on present
    /// records, and the cursor advances without ever rewinding. The durable
    /// store applies the same batch in one transaction.
    ///
    /// Readers observe either the pre-packet or post-packet view, never a
    /// partial mixture.
    pub async fn apply_server_changes(&self, batch: DeltaBatch) -> Result<()> {
        {
            let mut state = self.write();
            for prompt in &batch.prompts.upserts {
                state.prompts.insert(prompt.id.clone(), prompt.clone());
            }
            for deleted_id in &batch.prompts.deleted_ids {
                if let Some(prompt) = state.prompts.get_mut(deleted_id) {
                    prompt.is_deleted = true;
                }
            }
            for version in &batch.prompt_versions.upserts {
                state
                    .prompt_versions
                    .insert(version.id.clone(), version.clone());
            }
            for deleted_id in &batch.prompt_versions.deleted_ids {
                if let Some(version) = state.prompt_versions.get_mut(deleted_id) {
                    version.is_deleted = true;
                }
            }
            for group in &batch.groups.upserts {
                state.groups.insert(group.id.clone(), group.clone());
            }
            for deleted_id in &batch.groups.deleted_ids {
                if let Some(group) = state.groups.get_mut(deleted_id) {
                    group.is_deleted = true;
                }
            }
            if batch.sync_id > state.status.last_sync_id {
                state.status.last_sync_id = batch.sync_id;
                state.status.last_synced_at = Some(batch.timestamp.clone());
            }
        }
        self.bump();
        self.store.apply_deltas(batch).await?;
        Ok(())
    }

    /// Merge a patch into the status record and return the new snapshot.
    pub fn update_sync_status(&self, patch: StatusPatch) -> SyncStatus {
        let status = {
            let mut state = self.write();
            state.status.apply(patch);
            state.status.clone()
        };
        self.bump();
        status
    }

    /// Populate the view from the durable store and mark it ready.
    ///
    /// A failed read still marks the view ready with empty contents so the
    /// presentation layer can render; the next pull repopulates.
    pub fn hydrate(&self) {
        let loaded = (|| -> promptdeck_storage_sqlite::Result<_> {
            let prompts = self.store.active_prompts()?;
            let versions = self.store.active_prompt_versions()?;
            let groups = self.store.active_groups()?;
            let pending = self.store.pending_count()?;
            let meta = self.store.read_meta()?;
            Ok((prompts, versions, groups, pending, meta))
        })();

        let mut state = self.write();
        match loaded {
            Ok((prompts, versions, groups, pending, meta)) => {
                state.prompts = prompts
                    .into_iter()
                    .map(|prompt| (prompt.id.clone(), prompt))
                    .collect();
                state.prompt_versions = versions
                    .into_iter()
                    .map(|version| (version.id.clone(), version))
                    .collect();
                state.groups = groups
                    .into_iter()
                    .map(|group| (group.id.clone(), group))
                    .collect();
                state.status.pending_count = pending as usize;
                if let Some(meta) = meta {
                    state.status.last_sync_id = meta.last_sync_id;
                    state.status.last_synced_at = meta.last_synced_at;
                }
            }
            Err(err) => {
                log::error!("[Sync] hydration failed, starting empty: {err}");
                state.prompts = HashMap::new();
                state.prompt_versions = HashMap::new();
                state.groups = HashMap::new();
                state.status.pending_count = 0;
            }
        }
        state.ready = true;
        drop(state);
        self.bump();
    }

    /// Drop a queued mutation after server acknowledgement and keep the
    /// pending count in step with the queue.
    pub async fn remove_pending_mutation(&self, mutation_id: &str) -> Result<bool> {
        let removed = self.store.dequeue_mutation(mutation_id.to_string()).await?;
        if removed {
            let mut state = self.write();
            state.status.pending_count = state.status.pending_count.saturating_sub(1);
            drop(state);
            self.bump();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptdeck_core::sync::KindDelta;
    use tempfile::{tempdir, TempDir};

    async fn setup_view() -> (TempDir, Arc<CatalogStore>, Arc<CatalogView>) {
        let dir = tempdir().expect("tempdir");
        let store = Arc::new(
            CatalogStore::open_in_dir(&dir.path().to_string_lossy()).expect("open store"),
        );
        let view = CatalogView::new(Arc::clone(&store));
        view.hydrate();
        (dir, store, view)
    }

    fn titled(title: &str) -> NewPrompt {
        NewPrompt {
            title: title.to_string(),
            content: "body".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_is_immediately_visible_and_queued() {
        let (_dir, store, view) = setup_view().await;
        let prompt = view.create_prompt(titled("T")).await.expect("create");

        // Read-your-writes in the view.
        assert_eq!(view.active_prompts().len(), 1);
        assert_eq!(view.status().pending_count, 1);

        // Durable on both sides of the transaction.
        assert!(store.get_prompt(&prompt.id).expect("get").is_some());
        let queued = store.drain_ordered(None).expect("queue");
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].operation, MutationOperation::Create);
        assert_eq!(queued[0].entity_id, prompt.id);
    }

    #[tokio::test]
    async fn update_missing_is_a_silent_noop() {
        let (_dir, store, view) = setup_view().await;
        view.update_prompt("ghost", PromptPatch::default())
            .await
            .expect("update");
        assert_eq!(view.status().pending_count, 0);
        assert_eq!(store.pending_count().expect("count"), 0);
    }

    #[tokio::test]
    async fn delete_soft_deletes_but_keeps_the_record() {
        let (_dir, store, view) = setup_view().await;
        let prompt = view.create_prompt(titled("T")).await.expect("create");
        view.delete_prompt(&prompt.id).await.expect("delete");

        assert!(view.active_prompts().is_empty());
        let kept = view.prompt(&prompt.id).expect("still in view");
        assert!(kept.is_deleted);
        let stored = store
            .get_prompt(&prompt.id)
            .expect("get")
            .expect("still stored");
        assert!(stored.is_deleted);

        let queued = store.drain_ordered(None).expect("queue");
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[1].operation, MutationOperation::Delete);
        assert_eq!(queued[1].payload, None);
    }

    #[tokio::test]
    async fn selectors_filter_and_order() {
        let (_dir, _store, view) = setup_view().await;
        let group = view
            .create_group(NewGroup {
                name: "g".to_string(),
                color: "red".to_string(),
            })
            .await
            .expect("group");
        let mut favorite = titled("fav");
        favorite.is_favorite = true;
        favorite.group_id = Some(group.id.clone());
        view.create_prompt(favorite).await.expect("create fav");
        view.create_prompt(titled("plain")).await.expect("create");

        assert_eq!(view.favorite_prompts().len(), 1);
        assert_eq!(view.prompts_in_group(&group.id).len(), 1);
        assert_eq!(view.prompts_in_group("other").len(), 0);

        let prompt = &view.favorite_prompts()[0];
        let v1 = view
            .create_prompt_version(NewPromptVersion {
                prompt_id: prompt.id.clone(),
                content: "one".to_string(),
                note: None,
            })
            .await
            .expect("v1");
        let v2 = view
            .create_prompt_version(NewPromptVersion {
                prompt_id: prompt.id.clone(),
                content: "two".to_string(),
                note: None,
            })
            .await
            .expect("v2");
        let versions = view.versions_of(&prompt.id);
        assert_eq!(versions.len(), 2);
        // Newest first; same-stamp ties broken deterministically.
        let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
        assert!(ids.contains(&v1.id.as_str()) && ids.contains(&v2.id.as_str()));
        assert!(versions[0].created_at >= versions[1].created_at);
    }

    #[tokio::test]
    async fn hydrate_reflects_the_active_subset() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().to_string_lossy().to_string();
        let store = Arc::new(CatalogStore::open_in_dir(&path).expect("open"));
        let view = CatalogView::new(Arc::clone(&store));
        view.hydrate();
        view.create_prompt(titled("kept")).await.expect("create");
        let deleted = view.create_prompt(titled("gone")).await.expect("create");
        view.delete_prompt(&deleted.id).await.expect("delete");

        // Fresh view over the same store, as after a process restart.
        let rehydrated = CatalogView::new(Arc::clone(&store));
        rehydrated.hydrate();
        assert!(rehydrated.is_ready());
        assert_eq!(rehydrated.active_prompts().len(), 1);
        assert_eq!(rehydrated.status().pending_count, 3);
    }

    #[tokio::test]
    async fn apply_server_changes_overwrites_and_advances_cursor() {
        let (_dir, store, view) = setup_view().await;
        let local = view.create_prompt(titled("local")).await.expect("create");

        let mut server_copy = local.clone();
        server_copy.title = "server".to_string();
        server_copy.sync_id = Some(4);
        let batch = DeltaBatch {
            sync_id: 4,
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            prompts: KindDelta {
                upserts: vec![server_copy],
                deleted_ids: vec![],
            },
            ..Default::default()
        };
        view.apply_server_changes(batch).await.expect("apply");

        // Server value wins in the view...
        assert_eq!(view.prompt(&local.id).expect("prompt").title, "server");
        assert_eq!(view.status().last_sync_id, 4);
        // ...and in the store; the local mutation stays queued.
        assert_eq!(
            store.get_prompt(&local.id).expect("get").expect("row").title,
            "server"
        );
        assert_eq!(store.pending_count().expect("count"), 1);

        // A stale packet must not rewind the cursor.
        view.apply_server_changes(DeltaBatch {
            sync_id: 2,
            timestamp: "2024-01-01T00:00:01+00:00".to_string(),
            ..Default::default()
        })
        .await
        .expect("apply stale");
        assert_eq!(view.status().last_sync_id, 4);
    }

    #[tokio::test]
    async fn server_create_resurrects_a_locally_deleted_entity() {
        let (_dir, _store, view) = setup_view().await;
        let prompt = view.create_prompt(titled("T")).await.expect("create");
        view.delete_prompt(&prompt.id).await.expect("delete");
        assert!(view.active_prompts().is_empty());

        let mut reborn = prompt.clone();
        reborn.is_deleted = false;
        reborn.sync_id = Some(9);
        view.apply_server_changes(DeltaBatch {
            sync_id: 9,
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            prompts: KindDelta {
                upserts: vec![reborn],
                deleted_ids: vec![],
            },
            ..Default::default()
        })
        .await
        .expect("apply");
        assert_eq!(view.active_prompts().len(), 1, "server is authoritative");
    }

    #[tokio::test]
    async fn subscribe_observes_changes() {
        let (_dir, _store, view) = setup_view().await;
        let mut receiver = view.subscribe();
        let before = *receiver.borrow_and_update();
        view.create_prompt(titled("T")).await.expect("create");
        assert!(receiver.has_changed().expect("channel alive"));
        assert!(*receiver.borrow_and_update() > before);
    }

    #[tokio::test]
    async fn remove_pending_mutation_keeps_count_in_step() {
        let (_dir, store, view) = setup_view().await;
        view.create_prompt(titled("T")).await.expect("create");
        let queued = store.drain_ordered(None).expect("queue");
        assert!(view
            .remove_pending_mutation(&queued[0].id)
            .await
            .expect("remove"));
        assert_eq!(view.status().pending_count, 0);
        assert!(!view
            .remove_pending_mutation(&queued[0].id)
            .await
            .expect("second remove"));
    }
}
