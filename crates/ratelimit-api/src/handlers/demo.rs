//! Demo endpoints, each limited by its entry in the policy table.

use axum::Json;
use axum::http::Extensions;

use ratelimit_engine::RateLimitMetadata;

use crate::dto::response::DemoResponse;

/// GET /api/test
pub async fn test(extensions: Extensions) -> Json<DemoResponse> {
    Json(DemoResponse {
        headers: extensions
            .get::<RateLimitMetadata>()
            .map(|meta| (*meta).into()),
        ..DemoResponse::new("Test endpoint - rate limit: 10 requests, 2/sec")
    })
}

/// POST /api/login
pub async fn login() -> Json<DemoResponse> {
    Json(DemoResponse::new(
        "Login endpoint - strict rate limit (5 attempts per minute)",
    ))
}

/// GET /api/data
pub async fn data() -> Json<DemoResponse> {
    Json(DemoResponse {
        data: Some(serde_json::json!({ "example": "some data" })),
        ..DemoResponse::new("Data endpoint - normal rate limit (100 requests, 10/sec)")
    })
}

/// GET /api/public
pub async fn public() -> Json<DemoResponse> {
    Json(DemoResponse::new("Public endpoint - generous rate limit"))
}
