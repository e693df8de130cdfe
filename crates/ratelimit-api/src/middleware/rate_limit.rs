//! Admission middleware.
//!
//! Looks up the matched route in the policy table, consumes from the
//! caller's bucket, and attaches the `X-RateLimit-*` headers. Routes without
//! a policy pass through untouched.

use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use ratelimit_engine::RateLimitMetadata;

use crate::error::RateLimitRejection;
use crate::extractors::identity::request_identity;
use crate::state::AppState;

/// Bucket capacity header.
pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Remaining whole tokens header.
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// Reset time header, epoch milliseconds.
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Applies the route's rate limit policy to the request.
pub async fn rate_limit(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let Some(policy) = state.policies.lookup(request.method(), &path).copied() else {
        return next.run(request).await;
    };

    let identity = request_identity(
        request.headers(),
        request.extensions(),
        state.config.server.trust_forwarded_for,
    );
    let admission = state.admission.admit(&identity, &policy).await;

    let mut response = match admission.outcome {
        Ok(()) => {
            request.extensions_mut().insert(admission.metadata);
            next.run(request).await
        }
        Err(exceeded) => RateLimitRejection(exceeded).into_response(),
    };

    insert_headers(response.headers_mut(), &admission.metadata);
    response
}

fn insert_headers(headers: &mut HeaderMap, meta: &RateLimitMetadata) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(meta.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(meta.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(meta.reset));
}
