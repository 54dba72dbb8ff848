//! CLI module graph.

pub mod command;
pub mod detect;
pub mod diagnostic;
pub mod install;
pub mod output;
pub mod paths;
pub mod plan;
pub mod render;
pub mod service;
pub mod stack;
pub mod update;
