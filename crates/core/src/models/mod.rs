//! Catalog entity models.
//!
//! Every entity carries the shared sync envelope: a stable string id, RFC3339
//! creation/update stamps, the server cursor value assigned on acknowledgement
//! (`sync_id`), and a soft-delete flag. Records are never physically removed
//! by the sync layer; deletion sets `is_deleted`.

mod group;
mod kind;
mod prompt;
mod prompt_version;
mod record;

pub use group::{Group, GroupPatch, NewGroup};
pub use kind::EntityKind;
pub use prompt::{NewPrompt, Prompt, PromptPatch};
pub use prompt_version::{NewPromptVersion, PromptVersion};
pub use record::EntityRecord;

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
