//! Sync domain models: pending mutations, metadata, status, deltas, config.

mod config;
mod delta;
mod metadata;
mod mutation;
mod retry;
mod scheduler;
mod status;

pub use config::SyncConfig;
pub use delta::{DeltaBatch, KindDelta};
pub use metadata::{MetadataPatch, SyncMetadata, SYNC_METADATA_KEY};
pub use mutation::{MutationOperation, PendingMutation};
pub use retry::backoff_delay_ms;
pub use scheduler::*;
pub use status::{StatusPatch, SyncPhase, SyncStatus};
