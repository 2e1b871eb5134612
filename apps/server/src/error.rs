//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures surfaced as structured JSON error bodies.
#[derive(Debug)]
pub enum ApiError {
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
            }
        };
        tracing::error!("request failed: {code}: {message}");
        (status, Json(ErrorBody { code, message })).into_response()
    }
}
