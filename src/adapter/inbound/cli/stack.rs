//! Shared lookups for commands that operate on an install directory.

use std::path::{Path, PathBuf};

use super::command::StackArgs;
use super::diagnostic::{self, ConfigDiagnostic};
use super::{output, paths};
use crate::adapter::outbound::compose::ComposeGateway;
use crate::application::render::MANIFEST_FILE;
use crate::error::{ConfigError, Error, OrchestrationError, Result};
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::orchestrator::Orchestrator;

/// Load an answers file, printing a located diagnostic for syntax errors.
pub fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
    match Config::parse_toml(&content) {
        Err(Error::Config(ConfigError::Parse(err))) => {
            if !output::is_json() {
                let name = path.display().to_string();
                if let Some(report) = ConfigDiagnostic::from_toml(&name, &content, &err) {
                    diagnostic::report(report);
                }
            }
            Err(ConfigError::Parse(err).into())
        }
        other => other,
    }
}

/// Like [`read_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        read_config(path)
    } else {
        Ok(Config::default())
    }
}

/// Install directory for `args`.
pub fn install_dir(args: &StackArgs) -> Result<PathBuf> {
    paths::resolve_install_dir(args.dir.as_deref(), &args.config.config)
}

/// Install directory that must already hold a manifest.
pub fn existing_install(args: &StackArgs) -> Result<PathBuf> {
    let dir = install_dir(args)?;
    if !dir.join(MANIFEST_FILE).is_file() {
        return Err(ConfigError::Other(format!(
            "no stack found in {}; run `stackforge install` first",
            dir.display()
        ))
        .into());
    }
    Ok(dir)
}

/// Compose gateway for `dir`, after checking the daemon answers.
pub async fn gateway(dir: &Path) -> Result<ComposeGateway> {
    let gateway = ComposeGateway::detect(dir).await?;
    if !gateway.is_runtime_available().await {
        return Err(OrchestrationError::RuntimeUnavailable(
            "the docker daemon is not responding".into(),
        )
        .into());
    }
    Ok(gateway)
}
