use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::issue::ValidationIssue;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Template rendering failures. These indicate a mismatch between the
/// templates and the values the pipeline supplies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing value for {key} in template {template}")]
    MissingValue { template: &'static str, key: String },

    #[error("unterminated placeholder in template {template}")]
    Unterminated { template: &'static str },

    #[error("no {mode} route configured for {service}")]
    MissingRoute {
        service: &'static str,
        mode: &'static str,
    },

    #[error("no ACME email configured for the proxy")]
    MissingAcmeEmail,
}

/// Failures of the container runtime or the image registry.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("container runtime not available: {0}")]
    RuntimeUnavailable(String),

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr_tail}")]
    CommandFailed {
        command: String,
        status: String,
        stderr_tail: String,
    },

    #[error("`{command}` interrupted")]
    Interrupted { command: String },

    #[error("registry returned {status} for {image}")]
    Registry { image: String, status: u16 },

    #[error("unexpected registry response for {image}: {reason}")]
    RegistryPayload { image: String, reason: String },
}

/// Transient network failures. Callers may offer a retry.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("registry unreachable for {image}: {reason}")]
    Unreachable { image: String, reason: String },

    #[error("registry timed out for {image}")]
    Timeout { image: String },

    #[error("registry server error {status} for {image}")]
    ServerError { image: String, status: u16 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("resource plan cannot run: {}", summarize(.0))]
    PlanInfeasible(Vec<ValidationIssue>),

    #[error("invalid input: {}", summarize(.0))]
    InputInvalid(Vec<ValidationIssue>),

    #[error("{} warning(s) not acknowledged; rerun with --yes to write anyway", .0.len())]
    WarningsUnacknowledged(Vec<ValidationIssue>),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("env file error: {0}")]
    EnvFile(String),
}

impl Error {
    /// Network-class failures may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .filter(|issue| issue.is_error())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // dialoguer::Error wraps an IO error
        Error::Io(std::io::Error::other(err.to_string()))
    }
}

impl From<dotenvy::Error> for Error {
    fn from(err: dotenvy::Error) -> Self {
        Error::EnvFile(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_infeasible_lists_errors_only() {
        let err = Error::PlanInfeasible(vec![
            ValidationIssue::warning("disk", "low"),
            ValidationIssue::error("memory", "not enough"),
        ]);
        assert_eq!(err.to_string(), "resource plan cannot run: memory: not enough");
    }

    #[test]
    fn unacknowledged_warnings_count_in_message() {
        let err = Error::WarningsUnacknowledged(vec![ValidationIssue::warning(
            "database.port",
            "port 999 is privileged and needs root to bind",
        )]);
        assert_eq!(
            err.to_string(),
            "1 warning(s) not acknowledged; rerun with --yes to write anyway"
        );
    }

    #[test]
    fn only_network_errors_are_retryable() {
        let network = Error::from(NetworkError::Timeout {
            image: "n8nio/n8n".into(),
        });
        let registry = Error::from(OrchestrationError::Registry {
            image: "n8nio/n8n".into(),
            status: 404,
        });
        assert!(network.is_retryable());
        assert!(!registry.is_retryable());
    }

    #[test]
    fn render_error_names_the_key() {
        let err = RenderError::MissingValue {
            template: "env.template",
            key: "DATABASE_PASSWORD".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing value for DATABASE_PASSWORD in template env.template"
        );
    }
}
