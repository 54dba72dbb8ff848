//! Outbound ports (driven side): interfaces implemented by outbound adapters.

pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod store;
