//! Route handlers.

pub mod demo;
pub mod health;
pub mod status;
