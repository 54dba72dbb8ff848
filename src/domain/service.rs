//! Service identities for the provisioned stack.
//!
//! The stack is a fixed graph of five services. Each variant carries its
//! static catalog data: container image, internal port, env-file key prefix
//! and whether the user may switch it off.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A service in the provisioned stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// Workflow automation engine (n8n).
    WorkflowEngine,
    /// Flow-based AI builder (Langflow).
    FlowBuilder,
    /// Database platform (Postgres plus its HTTP API sidecar).
    Database,
    /// Local model runner (Ollama).
    ModelRunner,
    /// Reverse proxy terminating TLS (Caddy).
    Proxy,
}

impl ServiceKind {
    /// Every service in manifest order.
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::WorkflowEngine,
        ServiceKind::FlowBuilder,
        ServiceKind::Database,
        ServiceKind::ModelRunner,
        ServiceKind::Proxy,
    ];

    /// Services reachable through the proxy.
    pub const BACKENDS: [ServiceKind; 4] = [
        ServiceKind::WorkflowEngine,
        ServiceKind::FlowBuilder,
        ServiceKind::Database,
        ServiceKind::ModelRunner,
    ];

    /// Stable identifier used as the compose service name.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::WorkflowEngine => "workflow-engine",
            Self::FlowBuilder => "flow-builder",
            Self::Database => "database",
            Self::ModelRunner => "model-runner",
            Self::Proxy => "proxy",
        }
    }

    /// Human-readable label for prompts and tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WorkflowEngine => "Workflow engine (n8n)",
            Self::FlowBuilder => "Flow builder (Langflow)",
            Self::Database => "Database (Supabase Postgres)",
            Self::ModelRunner => "Model runner (Ollama)",
            Self::Proxy => "Reverse proxy (Caddy)",
        }
    }

    /// Upper-case prefix for env-file keys (`WORKFLOW_ENGINE_PORT`, ...).
    #[must_use]
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::WorkflowEngine => "WORKFLOW_ENGINE",
            Self::FlowBuilder => "FLOW_BUILDER",
            Self::Database => "DATABASE",
            Self::ModelRunner => "MODEL_RUNNER",
            Self::Proxy => "PROXY",
        }
    }

    /// Registry image name without tag.
    #[must_use]
    pub const fn image(self) -> &'static str {
        match self {
            Self::WorkflowEngine => "n8nio/n8n",
            Self::FlowBuilder => "langflowai/langflow",
            Self::Database => "supabase/postgres",
            Self::ModelRunner => "ollama/ollama",
            Self::Proxy => "caddy",
        }
    }

    /// Tag used when the user has not pinned a version.
    #[must_use]
    pub const fn default_tag(self) -> &'static str {
        match self {
            Self::Database => "15.8.1.060",
            Self::Proxy => "2-alpine",
            _ => "latest",
        }
    }

    /// Port the proxy forwards to inside the compose network.
    ///
    /// For the database this is the HTTP API sidecar, not Postgres itself.
    #[must_use]
    pub const fn upstream_port(self) -> u16 {
        match self {
            Self::WorkflowEngine => 5678,
            Self::FlowBuilder => 7860,
            Self::Database => 3000,
            Self::ModelRunner => 11434,
            Self::Proxy => 443,
        }
    }

    /// Container that serves HTTP traffic for this service.
    #[must_use]
    pub const fn upstream_host(self) -> &'static str {
        match self {
            Self::Database => "database-api",
            other => other.id(),
        }
    }

    /// Default public subdomain label (`n8n.example.com`).
    #[must_use]
    pub const fn default_subdomain(self) -> &'static str {
        match self {
            Self::WorkflowEngine => "n8n",
            Self::FlowBuilder => "langflow",
            Self::Database => "supabase",
            Self::ModelRunner => "ollama",
            Self::Proxy => "www",
        }
    }

    /// Default path prefix in path routing mode.
    #[must_use]
    pub const fn default_path_prefix(self) -> &'static str {
        match self {
            Self::WorkflowEngine => "/n8n",
            Self::FlowBuilder => "/langflow",
            Self::Database => "/supabase",
            Self::ModelRunner => "/ollama",
            Self::Proxy => "/",
        }
    }

    /// Whether the user may turn the service off.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            Self::WorkflowEngine | Self::FlowBuilder | Self::ModelRunner
        )
    }

    /// Whether the upstream serves correctly below a non-root path prefix.
    #[must_use]
    pub const fn supports_path_prefix(self) -> bool {
        !matches!(self, Self::FlowBuilder)
    }

    /// Env-file key for a suffix, e.g. `key("PORT")` → `WORKFLOW_ENGINE_PORT`.
    #[must_use]
    pub fn key(self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix(), suffix)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ServiceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "workflow-engine" | "n8n" => Ok(Self::WorkflowEngine),
            "flow-builder" | "langflow" => Ok(Self::FlowBuilder),
            "database" | "supabase" => Ok(Self::Database),
            "model-runner" | "ollama" => Ok(Self::ModelRunner),
            "proxy" | "caddy" => Ok(Self::Proxy),
            _ => Err(DomainError::UnknownService {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_product_aliases() {
        assert_eq!(
            "workflow-engine".parse::<ServiceKind>().unwrap(),
            ServiceKind::WorkflowEngine
        );
        assert_eq!("n8n".parse::<ServiceKind>().unwrap(), ServiceKind::WorkflowEngine);
        assert_eq!("Model_Runner".parse::<ServiceKind>().unwrap(), ServiceKind::ModelRunner);
        assert!("redis".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn env_keys_use_service_prefix() {
        assert_eq!(ServiceKind::FlowBuilder.key("PORT"), "FLOW_BUILDER_PORT");
        assert_eq!(ServiceKind::Database.key("MEMORY_LIMIT"), "DATABASE_MEMORY_LIMIT");
    }

    #[test]
    fn only_app_services_are_optional() {
        let optional: Vec<_> = ServiceKind::ALL
            .into_iter()
            .filter(|s| s.is_optional())
            .collect();
        assert_eq!(
            optional,
            vec![
                ServiceKind::WorkflowEngine,
                ServiceKind::FlowBuilder,
                ServiceKind::ModelRunner
            ]
        );
    }

    #[test]
    fn database_upstream_is_api_sidecar() {
        assert_eq!(ServiceKind::Database.upstream_host(), "database-api");
        assert_eq!(ServiceKind::Database.upstream_port(), 3000);
        assert_eq!(ServiceKind::WorkflowEngine.upstream_host(), "workflow-engine");
    }
}
