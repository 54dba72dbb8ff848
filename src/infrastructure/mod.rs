//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! installer logic.
//!
//! # Submodules
//!
//! - [`config`] - Answers file loading, logging and policy overrides

pub mod config;
