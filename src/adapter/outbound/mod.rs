//! Outbound adapters (driven side).

pub mod artifact_store;
pub mod compose;
pub mod host;
pub mod registry;
