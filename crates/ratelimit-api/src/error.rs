//! Maps domain errors and rate limit rejections to HTTP responses.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use ratelimit_core::error::{AppError, ErrorKind};
use ratelimit_engine::RateLimitExceeded;

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Handler error carrying an [`AppError`] to the response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_code) = match &err.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::RateLimit => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            ErrorKind::Store | ErrorKind::ServiceUnavailable => {
                tracing::warn!(error = %err, "Backing store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ErrorKind::Configuration | ErrorKind::Serialization | ErrorKind::Internal => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message: err.message.clone(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Body of a 429 produced by the admission middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooManyRequestsBody {
    /// Always `"Too Many Requests"`.
    pub error: String,
    /// Human-readable message including the wait.
    pub message: String,
    /// Seconds to wait before retrying.
    pub retry_after: u64,
}

/// Rejection returned when a request exceeds its rate limit.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRejection(pub RateLimitExceeded);

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let exceeded = self.0;
        let body = TooManyRequestsBody {
            error: "Too Many Requests".to_string(),
            message: exceeded.to_string(),
            retry_after: exceeded.reset_in,
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(exceeded.reset_in));
        response
    }
}
