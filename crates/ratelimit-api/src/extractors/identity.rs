//! `CallerIdentity` extractor: collects the facts a bucket identifier is
//! derived from.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

use ratelimit_core::types::RequestIdentity;

use crate::state::AppState;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Authenticated principal id, inserted into request extensions by an
/// upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub String);

/// Identity facts of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub RequestIdentity);

impl std::ops::Deref for CallerIdentity {
    type Target = RequestIdentity;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(request_identity(
            &parts.headers,
            &parts.extensions,
            state.config.server.trust_forwarded_for,
        )))
    }
}

/// Collects principal, API key, and source address from a request.
///
/// The source address is the peer address of the connection, or the first
/// `X-Forwarded-For` hop when `trust_forwarded_for` is set.
pub fn request_identity(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> RequestIdentity {
    let principal = extensions
        .get::<AuthenticatedPrincipal>()
        .map(|p| p.0.clone());

    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let forwarded = trust_forwarded_for
        .then(|| {
            headers
                .get(FORWARDED_FOR_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|hop| hop.trim().to_string())
                .filter(|hop| !hop.is_empty())
        })
        .flatten();

    let source_addr = forwarded.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });

    RequestIdentity {
        principal,
        api_key,
        source_addr,
    }
}
