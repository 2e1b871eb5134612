//! The sync engine: cursor-driven pull, queue drain, scheduling, lifecycle.
//!
//! One pull and one push may be in flight at a time, tracked by atomic
//! latches; pull and push may overlap each other. The push path never
//! installs the response cursor; the next pull carries it, which keeps the
//! pull path the single installer of server state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use promptdeck_core::sync::{
    backoff_delay_ms, MetadataPatch, StatusPatch, SyncConfig, SyncPhase, DEFAULT_PULL_LIMIT,
    DEFAULT_PUSH_BATCH, PULL_TICK_JITTER_MS, PUSH_DRAIN_DELAY_MS,
};
use promptdeck_storage_sqlite::CatalogStore;
use promptdeck_sync_client::{MutationEnvelope, PushRequest, SyncApiClient};

use crate::errors::{EngineError, Result};
use crate::hooks::SyncHooks;
use crate::view::CatalogView;

/// Outcome of one push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queue empty, offline, or another push already in flight.
    Skipped,
    /// A batch was processed; `remaining` mutations are still queued.
    Completed { remaining: i64 },
}

/// Background worker keeping the local replica coherent with the server.
pub struct SyncEngine {
    view: Arc<CatalogView>,
    store: Arc<CatalogStore>,
    client: SyncApiClient,
    config: SyncConfig,
    hooks: SyncHooks,
    /// Self-reference handed to spawned tick tasks.
    self_ref: Weak<SyncEngine>,
    client_id: Mutex<String>,
    online: AtomicBool,
    pull_in_flight: AtomicBool,
    push_in_flight: AtomicBool,
    started: AtomicBool,
    destroyed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    connectivity_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    pub fn new(
        view: Arc<CatalogView>,
        store: Arc<CatalogStore>,
        config: SyncConfig,
        hooks: SyncHooks,
    ) -> Arc<Self> {
        let client = SyncApiClient::new(&config.api_base_url);
        Arc::new_cyclic(|self_ref| Self {
            view,
            store,
            client,
            config,
            hooks,
            self_ref: self_ref.clone(),
            client_id: Mutex::new(String::new()),
            online: AtomicBool::new(true),
            pull_in_flight: AtomicBool::new(false),
            push_in_flight: AtomicBool::new(false),
            started: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            connectivity_task: Mutex::new(None),
        })
    }

    pub fn view(&self) -> &Arc<CatalogView> {
        &self.view
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The device identity sent with every mutation batch. Empty until
    /// [`SyncEngine::init`] has run.
    pub fn client_id(&self) -> String {
        self.client_id
            .lock()
            .expect("client id lock poisoned")
            .clone()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn set_status(&self, patch: StatusPatch) {
        let status = self.view.update_sync_status(patch);
        self.hooks.status_changed(&status);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Load or mint the client identity, hydrate the view, and set the
    /// initial status.
    pub async fn init(&self) -> Result<()> {
        let client_id = match self.config.client_id.clone() {
            Some(explicit) => explicit,
            None => self
                .store
                .read_meta()?
                .map(|meta| meta.client_id)
                .filter(|client_id| !client_id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        };
        self.store
            .write_meta(MetadataPatch {
                client_id: Some(client_id.clone()),
                ..Default::default()
            })
            .await?;
        log::debug!("[Sync] initialized with client id {client_id}");
        *self.client_id.lock().expect("client id lock poisoned") = client_id;

        self.view.hydrate();
        let online = self.is_online();
        self.set_status(StatusPatch {
            phase: Some(if online {
                SyncPhase::Idle
            } else {
                SyncPhase::Offline
            }),
            is_online: Some(online),
            ..Default::default()
        });
        Ok(())
    }

    /// Begin the timers and trigger an initial pull. Idempotent.
    pub fn start(&self) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(engine_ref) = self.self_ref.upgrade() else {
            return;
        };
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");

        let engine = Arc::clone(&engine_ref);
        tasks.push(tokio::spawn(async move {
            let _ = engine.pull_once().await;
        }));

        let engine = Arc::clone(&engine_ref);
        tasks.push(tokio::spawn(async move {
            loop {
                let jitter = rand::thread_rng().gen_range(0..=PULL_TICK_JITTER_MS);
                sleep(Duration::from_millis(engine.config.poll_interval_ms + jitter)).await;
                if engine.is_online() {
                    let _ = engine.pull_once().await;
                }
            }
        }));

        let engine = engine_ref;
        tasks.push(tokio::spawn(async move {
            let mut delay_ms = engine.config.poll_interval_ms;
            let mut consecutive_failures: u32 = 0;
            loop {
                sleep(Duration::from_millis(delay_ms)).await;
                if !engine.is_online() {
                    delay_ms = engine.config.poll_interval_ms;
                    continue;
                }
                delay_ms = match engine.push_once().await {
                    Ok(PushOutcome::Completed { remaining }) if remaining > 0 => {
                        consecutive_failures = 0;
                        PUSH_DRAIN_DELAY_MS
                    }
                    Ok(_) => {
                        consecutive_failures = 0;
                        engine.config.poll_interval_ms
                    }
                    Err(_) => {
                        // First retry waits initial_retry_delay_ms; repeated
                        // transport failures back off by retry_backoff.
                        let retry_delay = backoff_delay_ms(
                            engine.config.initial_retry_delay_ms,
                            engine.config.retry_backoff,
                            consecutive_failures,
                        );
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        retry_delay
                    }
                };
            }
        }));
    }

    /// Cancel the timers. In-flight requests are not aborted and the queue
    /// is untouched.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        for task in tasks.drain(..) {
            task.abort();
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Stop and unsubscribe from connectivity signals. Safe to call more
    /// than once.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.stop();
        let mut slot = self
            .connectivity_task
            .lock()
            .expect("connectivity task lock poisoned");
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    /// Follow an external online/offline signal.
    pub fn bind_connectivity(&self, mut signal: watch::Receiver<bool>) {
        let Some(engine) = self.self_ref.upgrade() else {
            return;
        };
        let handle = tokio::spawn(async move {
            loop {
                if signal.changed().await.is_err() {
                    break;
                }
                let online = *signal.borrow();
                engine.set_online(online).await;
            }
        });
        let mut slot = self
            .connectivity_task
            .lock()
            .expect("connectivity task lock poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Handle a connectivity transition. Going online kicks one pull and one
    /// push in addition to resuming the schedule.
    pub async fn set_online(&self, online: bool) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        self.hooks.online_change(online);
        if online {
            log::debug!("[Sync] connectivity restored");
            self.set_status(StatusPatch {
                phase: Some(SyncPhase::Idle),
                is_online: Some(true),
                ..Default::default()
            });
            let _ = self.pull_once().await;
            let _ = self.push_once().await;
        } else {
            log::debug!("[Sync] connectivity lost");
            self.set_status(StatusPatch {
                phase: Some(SyncPhase::Offline),
                is_online: Some(false),
                ..Default::default()
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pull
    // ─────────────────────────────────────────────────────────────────────

    /// Begin one pull immediately, bypassing the schedule.
    pub async fn force_sync(&self) -> Result<()> {
        self.pull_once().await
    }

    /// Single-flight pull; concurrent requests are dropped into the running
    /// one.
    async fn pull_once(&self) -> Result<()> {
        if !self.is_online() {
            log::debug!("[Sync] pull skipped while offline");
            return Ok(());
        }
        if self
            .pull_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        let result = self.run_pull().await;
        self.pull_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pull(&self) -> Result<()> {
        self.set_status(StatusPatch::phase(SyncPhase::Syncing));
        loop {
            let cursor = self.view.status().last_sync_id;
            let packet = match self.client.pull(cursor, Some(DEFAULT_PULL_LIMIT)).await {
                Ok(packet) => packet,
                Err(err) => {
                    let err = EngineError::from(err);
                    log::warn!("[Sync] pull failed: {err}");
                    self.set_status(StatusPatch::error(err.to_string()));
                    self.hooks.sync_error(&err);
                    return Err(err);
                }
            };
            let has_more = packet.has_more;
            log::debug!(
                "[Sync] pulled {} change(s), cursor {} -> {}, has_more={}",
                packet.change_count(),
                cursor,
                packet.sync_id,
                has_more
            );
            if let Err(err) = self.view.apply_server_changes(packet.clone().into_batch()).await {
                log::warn!("[Sync] failed to apply pulled changes: {err}");
                self.set_status(StatusPatch::error(err.to_string()));
                self.hooks.sync_error(&err);
                return Err(err);
            }
            self.hooks.sync_complete(&packet);
            if !has_more {
                break;
            }
            // More pages are waiting; fetch the next one immediately.
        }
        self.set_status(StatusPatch {
            phase: Some(SyncPhase::Idle),
            last_error: Some(None),
            ..Default::default()
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Push
    // ─────────────────────────────────────────────────────────────────────

    /// Begin one push immediately, bypassing the schedule.
    pub async fn force_push(&self) -> Result<PushOutcome> {
        self.push_once().await
    }

    /// Single-flight push of the oldest queued mutations.
    async fn push_once(&self) -> Result<PushOutcome> {
        if !self.is_online() {
            log::debug!("[Sync] push skipped while offline");
            return Ok(PushOutcome::Skipped);
        }
        if self
            .push_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(PushOutcome::Skipped);
        }
        let result = self.run_push().await;
        self.push_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_push(&self) -> Result<PushOutcome> {
        let batch = match self.store.drain_ordered(Some(DEFAULT_PUSH_BATCH)) {
            Ok(batch) => batch,
            Err(err) => {
                let err = EngineError::from(err);
                self.set_status(StatusPatch::error(err.to_string()));
                return Err(err);
            }
        };
        if batch.is_empty() {
            return Ok(PushOutcome::Skipped);
        }

        self.set_status(StatusPatch::phase(SyncPhase::Pushing));
        let request = PushRequest {
            client_id: self.client_id(),
            mutations: batch.iter().cloned().map(MutationEnvelope::from).collect(),
        };
        let response = match self.client.push(&request).await {
            Ok(response) => response,
            Err(err) => {
                // Transport failure is batch-level: leave every retry
                // counter untouched and let the next tick retry.
                let err = EngineError::from(err);
                log::warn!("[Sync] push failed: {err}");
                self.set_status(StatusPatch::error(err.to_string()));
                self.hooks.sync_error(&err);
                return Err(err);
            }
        };

        let mut pushed = 0usize;
        for result in &response.results {
            let Some(mutation) = batch.iter().find(|m| m.id == result.mutation_id) else {
                log::warn!(
                    "[Sync] server acknowledged unknown mutation {}",
                    result.mutation_id
                );
                continue;
            };
            if result.success {
                // The response may carry the server-minted entity; it is
                // deliberately not installed here. The next pull delivers it
                // through the one install path.
                self.view.remove_pending_mutation(&mutation.id).await?;
                pushed += 1;
            } else {
                let retries = mutation.retry_count + 1;
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "mutation rejected".to_string());
                if retries >= self.config.max_retries {
                    self.view.remove_pending_mutation(&mutation.id).await?;
                    let mut failed = mutation.clone();
                    failed.retry_count = retries;
                    failed.last_error = Some(message.clone());
                    log::warn!(
                        "[Sync] mutation {} permanently failed after {} attempt(s): {}",
                        failed.id,
                        retries,
                        message
                    );
                    self.hooks.mutation_failed(&failed, &message);
                } else {
                    self.store
                        .update_mutation(mutation.id.clone(), retries, Some(message))
                        .await?;
                }
            }
        }
        if pushed > 0 {
            self.hooks.mutations_pushed(pushed);
        }

        let remaining = self.store.pending_count()?;
        log::debug!(
            "[Sync] pushed {} of {} mutation(s), {} remaining, server cursor {}",
            pushed,
            batch.len(),
            remaining,
            response.sync_id
        );
        self.set_status(StatusPatch {
            phase: Some(SyncPhase::Idle),
            pending_count: Some(remaining as usize),
            last_error: Some(None),
            ..Default::default()
        });
        Ok(PushOutcome::Completed { remaining })
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        // Tasks hold their own Arc clones, so by the time this runs they are
        // already gone; abort defensively for the destroy-less path.
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptdeck_core::models::NewPrompt;
    use tempfile::{tempdir, TempDir};

    async fn setup_engine(config: SyncConfig) -> (TempDir, Arc<SyncEngine>) {
        let dir = tempdir().expect("tempdir");
        let store = Arc::new(
            CatalogStore::open_in_dir(&dir.path().to_string_lossy()).expect("open store"),
        );
        let view = CatalogView::new(Arc::clone(&store));
        let engine = SyncEngine::new(view, store, config, SyncHooks::default());
        engine.init().await.expect("init");
        (dir, engine)
    }

    #[tokio::test]
    async fn init_mints_and_persists_a_client_id() {
        let (_dir, engine) = setup_engine(SyncConfig::default()).await;
        let minted = engine.client_id();
        assert!(!minted.is_empty());

        // A second init keeps the persisted identity.
        engine.init().await.expect("re-init");
        assert_eq!(engine.client_id(), minted);
    }

    #[tokio::test]
    async fn config_client_id_overrides_persisted_identity() {
        let (_dir, engine) = setup_engine(SyncConfig {
            client_id: Some("device-7".to_string()),
            ..Default::default()
        })
        .await;
        assert_eq!(engine.client_id(), "device-7");
    }

    #[tokio::test]
    async fn push_with_empty_queue_is_skipped() {
        let (_dir, engine) = setup_engine(SyncConfig::default()).await;
        let outcome = engine.force_push().await.expect("push");
        assert_eq!(outcome, PushOutcome::Skipped);
    }

    #[tokio::test]
    async fn offline_transition_sets_status_and_skips_operations() {
        let (_dir, engine) = setup_engine(SyncConfig::default()).await;
        engine.set_online(false).await;
        assert_eq!(engine.view().status().phase, SyncPhase::Offline);
        assert!(!engine.view().status().is_online);

        engine
            .view()
            .create_prompt(NewPrompt {
                title: "T".to_string(),
                ..Default::default()
            })
            .await
            .expect("create");
        // Offline: both operations are skipped without touching the queue.
        engine.force_sync().await.expect("pull skipped");
        let outcome = engine.force_push().await.expect("push skipped");
        assert_eq!(outcome, PushOutcome::Skipped);
        assert_eq!(engine.view().status().pending_count, 1);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let (_dir, engine) = setup_engine(SyncConfig {
            // Point at a closed port so background ticks fail fast.
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            ..Default::default()
        })
        .await;
        engine.start();
        engine.start();
        engine.stop();
        engine.stop();
        engine.destroy();
        engine.destroy();
        // After destroy, start is refused.
        engine.start();
        assert!(engine.tasks.lock().expect("tasks").is_empty());
    }
}
