//! Engine configuration surface.

use serde::{Deserialize, Serialize};

/// Default base URL for the sync endpoints.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Tunable knobs recognized by the sync engine. All fields have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Base URL for the `sync` and `mutations` endpoints.
    pub api_base_url: String,
    /// Milliseconds between pull ticks.
    #[serde(rename = "pollInterval")]
    pub poll_interval_ms: u64,
    /// Per-mutation retry budget before permanent failure.
    pub max_retries: i32,
    /// Multiplier applied to the retry delay on consecutive transport
    /// failures. `1` keeps the delay flat.
    pub retry_backoff: u32,
    /// Milliseconds before the first retry after a transport failure.
    #[serde(rename = "initialRetryDelay")]
    pub initial_retry_delay_ms: u64,
    /// Overrides the persisted device identity when set.
    pub client_id: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval_ms: 5_000,
            max_retries: 5,
            retry_backoff: 2,
            initial_retry_delay_ms: 1_000,
            client_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:3001/api");
        assert_eq!(config.poll_interval_ms, 5_000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_backoff, 2);
        assert_eq!(config.initial_retry_delay_ms, 1_000);
        assert_eq!(config.client_id, None);
    }
}
