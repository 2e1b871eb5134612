//! Host-supplied event callbacks.

use std::sync::Arc;

use promptdeck_core::sync::{PendingMutation, SyncStatus};
use promptdeck_sync_client::DeltaPacket;

use crate::errors::EngineError;

type StatusFn = dyn Fn(&SyncStatus) + Send + Sync;
type PacketFn = dyn Fn(&DeltaPacket) + Send + Sync;
type ErrorFn = dyn Fn(&EngineError) + Send + Sync;
type PushedFn = dyn Fn(usize) + Send + Sync;
type MutationFailedFn = dyn Fn(&PendingMutation, &str) + Send + Sync;
type OnlineFn = dyn Fn(bool) + Send + Sync;

/// Optional callbacks fired by the engine. All default to no-ops.
#[derive(Clone, Default)]
pub struct SyncHooks {
    pub on_status_change: Option<Arc<StatusFn>>,
    pub on_sync_complete: Option<Arc<PacketFn>>,
    pub on_sync_error: Option<Arc<ErrorFn>>,
    pub on_mutations_pushed: Option<Arc<PushedFn>>,
    pub on_mutation_failed: Option<Arc<MutationFailedFn>>,
    pub on_online_change: Option<Arc<OnlineFn>>,
}

impl SyncHooks {
    pub fn on_status_change(mut self, hook: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Arc::new(hook));
        self
    }

    pub fn on_sync_complete(mut self, hook: impl Fn(&DeltaPacket) + Send + Sync + 'static) -> Self {
        self.on_sync_complete = Some(Arc::new(hook));
        self
    }

    pub fn on_sync_error(mut self, hook: impl Fn(&EngineError) + Send + Sync + 'static) -> Self {
        self.on_sync_error = Some(Arc::new(hook));
        self
    }

    pub fn on_mutations_pushed(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_mutations_pushed = Some(Arc::new(hook));
        self
    }

    pub fn on_mutation_failed(
        mut self,
        hook: impl Fn(&PendingMutation, &str) + Send + Sync + 'static,
    ) -> Self {
        self.on_mutation_failed = Some(Arc::new(hook));
        self
    }

    pub fn on_online_change(mut self, hook: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_online_change = Some(Arc::new(hook));
        self
    }

    pub(crate) fn status_changed(&self, status: &SyncStatus) {
        if let Some(hook) = &self.on_status_change {
            hook(status);
        }
    }

    pub(crate) fn sync_complete(&self, packet: &DeltaPacket) {
        if let Some(hook) = &self.on_sync_complete {
            hook(packet);
        }
    }

    pub(crate) fn sync_error(&self, error: &EngineError) {
        if let Some(hook) = &self.on_sync_error {
            hook(error);
        }
    }

    pub(crate) fn mutations_pushed(&self, count: usize) {
        if let Some(hook) = &self.on_mutations_pushed {
            hook(count);
        }
    }

    pub(crate) fn mutation_failed(&self, mutation: &PendingMutation, error: &str) {
        if let Some(hook) = &self.on_mutation_failed {
            hook(mutation, error);
        }
    }

    pub(crate) fn online_change(&self, is_online: bool) {
        if let Some(hook) = &self.on_online_change {
            hook(is_online);
        }
    }
}

impl std::fmt::Debug for SyncHooks {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncHooks")
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_sync_complete", &self.on_sync_complete.is_some())
            .field("on_sync_error", &self.on_sync_error.is_some())
            .field("on_mutations_pushed", &self.on_mutations_pushed.is_some())
            .field("on_mutation_failed", &self.on_mutation_failed.is_some())
            .field("on_online_change", &self.on_online_change.is_some())
            .finish()
    }
}
