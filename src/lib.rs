//! Stackforge - hardware-aware installer for a self-hosted AI stack.
//!
//! Detects the host's CPU, memory, disk and GPU, splits memory and CPU
//! across a workflow engine, a flow builder, a database platform, a local
//! model runner and a TLS-terminating reverse proxy, then renders the env
//! file, compose manifest and proxy configuration for that host.
//!
//! # Architecture
//!
//! Hexagonal layout:
//!
//! - [`domain`] - Value types: services, hardware facts, plans, routing
//! - [`application`] - Budgeting, checking, validation, rendering, and the
//!   install and update flows
//! - [`port`] - Traits for the host probe, container runtime, registry and
//!   install directory
//! - [`adapter`] - The CLI and the implementations behind each port
//! - [`infrastructure`] - Answers file and logging configuration
//! - [`error`] - Crate error types
//!
//! # Example
//!
//! ```no_run
//! use stackforge::adapter::outbound::artifact_store::FsArtifactStore;
//! use stackforge::adapter::outbound::host::HostProbe;
//! use stackforge::application::pipeline::InstallPipeline;
//! use stackforge::infrastructure::config::settings::Config;
//!
//! fn main() -> stackforge::error::Result<()> {
//!     let config = Config::load("answers.toml")?;
//!     let store = FsArtifactStore::new("/srv/stack");
//!     let probe = HostProbe::new("/srv/stack");
//!     let pipeline = InstallPipeline::new(&probe, &store, config.policy()?);
//!     let outcome = pipeline.run(&config.request()?)?;
//!     println!("wrote {} files", outcome.report.written.len());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
