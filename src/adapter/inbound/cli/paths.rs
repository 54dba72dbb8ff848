//! Path utilities for stackforge.
//!
//! Defaults live under `~/.stackforge/`:
//! - `~/.stackforge/config.toml` - install answers
//! - `~/.stackforge/stack/` - generated artifacts and backups

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Returns the stackforge home directory (`~/.stackforge/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stackforge")
}

/// Returns the default answers file path (`~/.stackforge/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

/// Returns the default install directory (`~/.stackforge/stack/`).
pub fn default_install_dir() -> PathBuf {
    home_dir().join("stack")
}

/// Install directory: explicit flag, else the answers file's
/// `install_dir`, else the default. A missing answers file is not an error.
pub fn resolve_install_dir(flag: Option<&Path>, config: &Path) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if config.exists() {
        if let Some(dir) = Config::load(config)?.install_dir {
            return Ok(dir);
        }
    }
    Ok(default_install_dir())
}
