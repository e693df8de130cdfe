//! # ratelimit-engine
//!
//! Admission control on top of a shared bucket store:
//!
//! - [`RateLimitEngine`]: check-and-consume with a failure policy, plus
//!   read-only status queries
//! - [`AdmissionController`]: identifier derivation and the decision
//!   metadata attached to every limited request

pub mod admission;
pub mod engine;
pub mod policy;

pub use admission::{Admission, AdmissionController, RateLimitExceeded, RateLimitMetadata};
pub use engine::RateLimitEngine;
pub use policy::FailurePolicy;
