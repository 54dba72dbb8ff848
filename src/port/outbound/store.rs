//! Install directory port.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::artifact::RenderedArtifacts;
use crate::error::Result;

/// What a write changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files written, relative to the install root.
    pub written: Vec<PathBuf>,
    /// Stale site files removed, relative to the install root.
    pub removed: Vec<PathBuf>,
}

/// Reads and writes generated artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Write every artifact, each file atomically, then drop stale site files.
    fn write(&self, artifacts: &RenderedArtifacts) -> Result<WriteReport>;

    /// Parse the current env file. Missing file yields an empty map.
    fn read_env(&self) -> Result<HashMap<String, String>>;

    /// Replace values of existing env keys and append new ones, atomically.
    fn update_env(&self, updates: &[(String, String)]) -> Result<()>;

    /// Copy current artifacts into a fresh timestamped backup directory.
    fn backup(&self) -> Result<PathBuf>;
}
