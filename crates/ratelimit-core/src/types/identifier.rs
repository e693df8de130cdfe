//! Caller identifiers that buckets are keyed by.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespaced bucket owner.
///
/// The source prefix keeps identifiers from different sources apart, so an
/// API key can never collide with a user id or an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    /// An authenticated principal.
    User(String),
    /// A presented API key.
    ApiKey(String),
    /// A network source address.
    Ip(String),
    /// Nothing identifying was available.
    Anonymous,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::ApiKey(key) => write!(f, "apikey:{key}"),
            Self::Ip(addr) => write!(f, "ip:{addr}"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Identity facts extracted from one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    /// Authenticated principal id, set by an upstream auth layer.
    pub principal: Option<String>,
    /// Value of the API key header.
    pub api_key: Option<String>,
    /// Network source address.
    pub source_addr: Option<String>,
}

impl RequestIdentity {
    /// Derives the bucket identifier.
    ///
    /// Precedence: principal, then API key, then source address, then
    /// [`Identifier::Anonymous`]. Blank values are skipped.
    pub fn identifier(&self) -> Identifier {
        if let Some(id) = non_blank(&self.principal) {
            return Identifier::User(id.to_string());
        }
        if let Some(key) = non_blank(&self.api_key) {
            return Identifier::ApiKey(key.to_string());
        }
        if let Some(addr) = non_blank(&self.source_addr) {
            return Identifier::Ip(addr.to_string());
        }
        Identifier::Anonymous
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
