//! Validated non-routing install answers.

use std::collections::BTreeMap;
use std::fmt;

use super::service::ServiceKind;

/// Env keys holding generated secrets.
pub const DATABASE_PASSWORD: &str = "DATABASE_PASSWORD";
pub const DATABASE_JWT_SECRET: &str = "DATABASE_JWT_SECRET";
pub const WORKFLOW_ENGINE_ENCRYPTION_KEY: &str = "WORKFLOW_ENGINE_ENCRYPTION_KEY";
pub const FLOW_BUILDER_SECRET_KEY: &str = "FLOW_BUILDER_SECRET_KEY";

/// Service secrets written to the env file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub database_password: String,
    pub jwt_secret: String,
    pub workflow_encryption_key: String,
    pub flow_builder_secret_key: String,
}

impl Credentials {
    /// `(env key, value)` pairs in env-file order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            (DATABASE_PASSWORD, &self.database_password),
            (DATABASE_JWT_SECRET, &self.jwt_secret),
            (WORKFLOW_ENGINE_ENCRYPTION_KEY, &self.workflow_encryption_key),
            (FLOW_BUILDER_SECRET_KEY, &self.flow_builder_secret_key),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("database_password", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("workflow_encryption_key", &"[redacted]")
            .field("flow_builder_secret_key", &"[redacted]")
            .finish()
    }
}

/// Everything the renderer needs besides the plan and routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallInput {
    /// Compose project name.
    pub project_name: String,
    /// IANA timezone passed to services that schedule work.
    pub timezone: String,
    /// Pinned image tags; missing entries use the catalog default.
    pub versions: BTreeMap<ServiceKind, String>,
    pub credentials: Credentials,
}

impl InstallInput {
    /// Image tag for `service`.
    #[must_use]
    pub fn version(&self, service: ServiceKind) -> &str {
        self.versions
            .get(&service)
            .map_or(service.default_tag(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            database_password: "pw".into(),
            jwt_secret: "jwt".into(),
            workflow_encryption_key: "enc".into(),
            flow_builder_secret_key: "sk".into(),
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("jwt\""));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn version_falls_back_to_default_tag() {
        let mut versions = BTreeMap::new();
        versions.insert(ServiceKind::WorkflowEngine, "1.64.0".to_string());
        let input = InstallInput {
            project_name: "stack".into(),
            timezone: "UTC".into(),
            versions,
            credentials: credentials(),
        };

        assert_eq!(input.version(ServiceKind::WorkflowEngine), "1.64.0");
        assert_eq!(input.version(ServiceKind::Proxy), "2-alpine");
    }
}
