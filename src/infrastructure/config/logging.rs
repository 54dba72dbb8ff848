//! Logging configuration and initialization.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Level implied by the CLI's `-q`/`-v` flags.
    #[must_use]
    pub fn for_verbosity(quiet: bool, verbose: u8) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        };
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Combine an optional `[logging]` table with the CLI flags. The table
    /// supplies the format, and the level when no flag was given.
    #[must_use]
    pub fn resolve(file: Option<&LoggingConfig>, quiet: bool, verbose: u8) -> Self {
        let mut resolved = Self::for_verbosity(quiet, verbose);
        if let Some(file) = file {
            resolved.format = file.format.clone();
            if !quiet && verbose == 0 {
                resolved.level = file.level.clone();
            }
        }
        resolved
    }

    /// Initialize the tracing subscriber with this logging configuration.
    ///
    /// `RUST_LOG` wins over the configured level. Logs go to stderr so they
    /// never mix with command output.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        // A subscriber installed earlier stays in place.
        let _ = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        };
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
