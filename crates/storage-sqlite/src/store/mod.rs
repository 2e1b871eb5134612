//! Durable store for catalog entities, the pending-mutation queue, and the
//! sync metadata singleton.

mod model;
mod repository;

pub use model::{
    GroupRow, PendingMutationRow, PromptRow, PromptVersionRow, SyncMetadataRow,
};
pub use repository::CatalogStore;
