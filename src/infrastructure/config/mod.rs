//! Configuration modules.

pub mod logging;
pub mod policy;
pub mod settings;
