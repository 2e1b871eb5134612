//! Sync status record and its state machine.

use serde::{Deserialize, Serialize};

/// Engine activity phase.
///
/// Transitions:
/// - any phase goes to `Offline` when connectivity is lost, and `Offline`
///   returns to `Idle` when it comes back;
/// - `Idle` enters `Syncing` for a pull and returns to `Idle` on success or
///   `Error` on failure;
/// - `Idle`/`Error` enter `Pushing` for a drain and return to `Idle` on
///   success or `Error` on transport failure;
/// - `Error` clears back to `Idle` when any subsequent operation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
    Pushing,
    Error,
    Offline,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Syncing => "syncing",
            SyncPhase::Pushing => "pushing",
            SyncPhase::Error => "error",
            SyncPhase::Offline => "offline",
        }
    }
}

/// Lightweight status record exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_sync_id: i64,
    pub last_synced_at: Option<String>,
    pub pending_count: usize,
    pub is_online: bool,
    pub last_error: Option<String>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Idle,
            last_sync_id: 0,
            last_synced_at: None,
            pending_count: 0,
            is_online: true,
            last_error: None,
        }
    }
}

/// Partial status update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub phase: Option<SyncPhase>,
    pub last_sync_id: Option<i64>,
    pub last_synced_at: Option<String>,
    pub pending_count: Option<usize>,
    pub is_online: Option<bool>,
    /// `Some(None)` clears a previously recorded error.
    pub last_error: Option<Option<String>>,
}

impl StatusPatch {
    pub fn phase(phase: SyncPhase) -> Self {
        Self {
            phase: Some(phase),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            phase: Some(SyncPhase::Error),
            last_error: Some(Some(message.into())),
            ..Default::default()
        }
    }
}

impl SyncStatus {
    /// Merge a patch into this record.
    pub fn apply(&mut self, patch: StatusPatch) {
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(last_sync_id) = patch.last_sync_id {
            self.last_sync_id = last_sync_id;
        }
        if let Some(last_synced_at) = patch.last_synced_at {
            self.last_synced_at = Some(last_synced_at);
        }
        if let Some(pending_count) = patch.pending_count {
            self.pending_count = pending_count;
        }
        if let Some(is_online) = patch.is_online {
            self.is_online = is_online;
        }
        if let Some(last_error) = patch.last_error {
            self.last_error = last_error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serialization_matches_wire_contract() {
        let actual = [
            SyncPhase::Idle,
            SyncPhase::Syncing,
            SyncPhase::Pushing,
            SyncPhase::Error,
            SyncPhase::Offline,
        ]
        .iter()
        .map(|phase| serde_json::to_string(phase).expect("serialize phase"))
        .collect::<Vec<_>>();
        assert_eq!(
            actual,
            vec![
                "\"idle\"",
                "\"syncing\"",
                "\"pushing\"",
                "\"error\"",
                "\"offline\""
            ]
        );
    }

    #[test]
    fn patch_merge_is_field_wise() {
        let mut status = SyncStatus::default();
        status.apply(StatusPatch::error("boom"));
        assert_eq!(status.phase, SyncPhase::Error);
        assert_eq!(status.last_error.as_deref(), Some("boom"));

        status.apply(StatusPatch {
            phase: Some(SyncPhase::Idle),
            last_error: Some(None),
            ..Default::default()
        });
        assert_eq!(status.phase, SyncPhase::Idle);
        assert_eq!(status.last_error, None);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut status = SyncStatus::default();
        let before = status.clone();
        status.apply(StatusPatch::default());
        assert_eq!(status, before);
    }
}
