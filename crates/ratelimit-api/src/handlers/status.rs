//! Rate limit status handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::RateLimitStatusResponse;
use crate::error::ApiError;
use crate::extractors::CallerIdentity;
use crate::state::AppState;

/// GET /api/rate-limit-status
///
/// Reports the caller's bucket under the status policy without consuming
/// anything. The route itself is not limited.
pub async fn rate_limit_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<RateLimitStatusResponse>, ApiError> {
    let identifier = caller.identifier().to_string();
    let status = state
        .engine
        .get_status(&identifier, &state.status_policy)
        .await?;

    Ok(Json(RateLimitStatusResponse { identifier, status }))
}
