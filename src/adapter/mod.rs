//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - the `stackforge` command line
//! - [`outbound`] - host probe, compose gateway, Docker Hub client, filesystem store

pub mod inbound;
pub mod outbound;
