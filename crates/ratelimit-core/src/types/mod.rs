//! Shared domain types used across all crates.

pub mod decision;
pub mod identifier;
pub mod policy;

pub use decision::{BucketStatus, Decision};
pub use identifier::{Identifier, RequestIdentity};
pub use policy::Policy;
