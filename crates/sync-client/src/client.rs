//! HTTP client for the sync endpoints.

use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::{Result, SyncApiError};
use crate::types::{DeltaPacket, PushRequest, PushResponse, SyncRequest};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Error body shape emitted by the reference server.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: String,
    message: String,
}

/// Client for the sync and mutations endpoints.
#[derive(Debug, Clone)]
pub struct SyncApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl SyncApiClient {
    /// Create a new client.
    ///
    /// `base_url` is the prefix shared by both endpoints, e.g.
    /// `http://localhost:3001/api`.
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[SyncApi] response status: {}", status);
            return;
        }
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[SyncApi] response error ({}): {}", status, preview);
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(SyncApiError::api(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(SyncApiError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|err| {
            log::error!(
                "[SyncApi] failed to deserialize response. Body: {}, Error: {}",
                body,
                err
            );
            SyncApiError::api(status.as_u16(), format!("Failed to parse response: {}", err))
        })
    }

    /// Fetch the delta packet since `last_sync_id`.
    ///
    /// POST {base}/sync
    pub async fn pull(&self, last_sync_id: i64, limit: Option<i64>) -> Result<DeltaPacket> {
        let url = format!("{}/sync", self.base_url);
        debug!("[SyncApi] pull since cursor {}", last_sync_id);

        let response = self
            .client
            .post(&url)
            .json(&SyncRequest {
                last_sync_id,
                limit,
            })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Push a batch of queued mutations.
    ///
    /// POST {base}/mutations
    pub async fn push(&self, request: &PushRequest) -> Result<PushResponse> {
        let url = format!("{}/mutations", self.base_url);
        debug!(
            "[SyncApi] push {} mutation(s) for client {}",
            request.mutations.len(),
            request.client_id
        );

        let response = self.client.post(&url).json(request).send().await?;
        Self::parse_response(response).await
    }
}
