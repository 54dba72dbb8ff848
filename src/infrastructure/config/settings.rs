//! Answers file loading and validation.
//!
//! The answers file records every choice the install wizard makes, so
//! `stackforge render --config <file>` can replay an install without
//! prompting.
//!
//! # Example
//!
//! ```no_run
//! use stackforge::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("stackforge.toml")?;
//!     let request = config.request()?;
//!     println!("routing mode: {}", request.routing.mode());
//!     Ok(())
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::policy::PolicyConfig;
use crate::application::budget::BudgetOverrides;
use crate::application::pipeline::{HardwareOverrides, InstallRequest};
use crate::application::validator::{check_timezone, parse_memory_mb, FieldKind, InputValidator};
use crate::domain::hardware::GpuVendor;
use crate::domain::policy::PolicyTable;
use crate::domain::routing::{CertificateAuthority, RoutingConfig, RoutingMode};
use crate::domain::service::ServiceKind;
use crate::error::{ConfigError, Error, Result};

/// Default compose project name.
pub const DEFAULT_PROJECT_NAME: &str = "stackforge";

/// `[routing]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingSection {
    #[serde(default)]
    pub mode: RoutingMode,
    /// Base domain. Subdomain mode derives missing hostnames from it; path
    /// mode serves every prefix under it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acme_email: Option<String>,
    #[serde(default)]
    pub ca: CertificateAuthority,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<String, i64>,
}

/// `[services]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesSection {
    /// Optional services to leave out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
    /// Run the model runner without a GPU.
    #[serde(default)]
    pub force_cpu_model_runner: bool,
    /// Memory ceilings such as `"6g"` or `"512m"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub memory: BTreeMap<String, String>,
}

/// `[hardware]` table: replaces detected values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_disk_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuVendor>,
}

/// Install answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Directory receiving the generated artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,

    /// Log settings; CLI `-q`/`-v` flags take precedence over the level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(default)]
    pub routing: RoutingSection,

    #[serde(default)]
    pub services: ServicesSection,

    /// Pinned image tags keyed by service.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, String>,

    #[serde(default)]
    pub hardware: HardwareSection,

    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            timezone: default_timezone(),
            install_dir: None,
            logging: None,
            routing: RoutingSection::default(),
            services: ServicesSection::default(),
            versions: BTreeMap::new(),
            hardware: HardwareSection::default(),
            policy: PolicyConfig::default(),
        }
    }
}

fn service_key(field: &'static str, name: &str) -> Result<ServiceKind> {
    name.parse().map_err(|_| {
        ConfigError::InvalidValue {
            field,
            reason: format!("unknown service `{name}`"),
        }
        .into()
    })
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Other(e.to_string()).into())
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        let name_ok = !self.project_name.is_empty()
            && self
                .project_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !name_ok {
            return Err(ConfigError::InvalidValue {
                field: "project_name",
                reason: "use lowercase letters, digits, `-` and `_`".into(),
            }
            .into());
        }
        if self.timezone.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "timezone" }.into());
        }
        check_timezone(&self.timezone).map_err(|reason| ConfigError::InvalidValue {
            field: "timezone",
            reason,
        })?;
        // Surface bad service names and sizes at load time.
        self.overrides()?;
        self.versions()?;
        self.policy()?;
        Ok(())
    }

    /// Resolved routing configuration with defaults filled in.
    ///
    /// Subdomain mode derives missing hosts from `domain`, path mode uses
    /// each service's default prefix, port mode its internal port.
    pub fn routing(&self) -> Result<RoutingConfig> {
        let section = &self.routing;
        let mut routing = RoutingConfig::new(section.mode);
        if let Some(email) = &section.acme_email {
            routing.set_acme_email(email.trim());
        }
        routing.set_authority(section.ca);

        let hosts = keyed(&section.hosts, "routing.hosts")?;
        let paths = keyed(&section.paths, "routing.paths")?;
        let ports = keyed(&section.ports, "routing.ports")?;
        let domain = section.domain.as_deref().map(str::trim);

        match section.mode {
            RoutingMode::Subdomain => {
                for service in ServiceKind::BACKENDS {
                    let host = hosts.get(&service).cloned().or_else(|| {
                        domain.map(|d| format!("{}.{d}", service.default_subdomain()))
                    });
                    if let Some(host) = host {
                        routing.set_host(service, host.trim());
                    }
                }
            }
            RoutingMode::Path => {
                if let Some(domain) = domain {
                    routing.set_base_domain(domain);
                }
                for service in ServiceKind::BACKENDS {
                    let prefix = paths
                        .get(&service)
                        .cloned()
                        .unwrap_or_else(|| service.default_path_prefix().to_string());
                    routing.set_prefix(service, prefix.trim());
                }
            }
            RoutingMode::Port => {
                let validator = InputValidator::new(RoutingMode::Port);
                let mut issues = Vec::new();
                for service in ServiceKind::BACKENDS {
                    let port = ports
                        .get(&service)
                        .copied()
                        .unwrap_or_else(|| i64::from(service.upstream_port()));
                    match validator.validate(FieldKind::Port, &port.to_string()) {
                        Some(issue) if issue.is_error() => {
                            issues.push(issue.relabel(format!("{service}.port")));
                        }
                        _ => {
                            if let Ok(port) = u16::try_from(port) {
                                routing.set_port(service, port);
                            }
                        }
                    }
                }
                if !issues.is_empty() {
                    return Err(Error::InputInvalid(issues));
                }
            }
        }
        Ok(routing)
    }

    /// Budget overrides from `[services]`.
    pub fn overrides(&self) -> Result<BudgetOverrides> {
        let mut disabled = BTreeSet::new();
        for name in &self.services.disabled {
            let service = service_key("services.disabled", name)?;
            if !service.is_optional() {
                return Err(ConfigError::InvalidValue {
                    field: "services.disabled",
                    reason: format!("{service} is required and cannot be disabled"),
                }
                .into());
            }
            disabled.insert(service);
        }

        let mut memory_ceilings = BTreeMap::new();
        for (name, size) in &self.services.memory {
            let service = service_key("services.memory", name)?;
            let mb = parse_memory_mb(size).map_err(|reason| ConfigError::InvalidValue {
                field: "services.memory",
                reason: format!("{service}: {reason}"),
            })?;
            memory_ceilings.insert(service, mb);
        }

        Ok(BudgetOverrides {
            force_cpu_model_runner: self.services.force_cpu_model_runner,
            disabled,
            memory_ceilings,
            without_proxy: !self.routing.mode.uses_proxy(),
        })
    }

    /// Pinned image tags.
    pub fn versions(&self) -> Result<BTreeMap<ServiceKind, String>> {
        let mut versions = BTreeMap::new();
        for (name, tag) in &self.versions {
            let tag = tag.trim();
            if tag.is_empty() || tag.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    field: "versions",
                    reason: format!("invalid tag for {name}"),
                }
                .into());
            }
            versions.insert(service_key("versions", name)?, tag.to_string());
        }
        Ok(versions)
    }

    #[must_use]
    pub fn hardware(&self) -> HardwareOverrides {
        HardwareOverrides {
            cpu_cores: self.hardware.cpu_cores,
            total_memory_mb: self.hardware.memory_mb,
            free_disk_mb: self.hardware.free_disk_mb,
            gpu: self.hardware.gpu,
        }
    }

    pub fn policy(&self) -> Result<PolicyTable> {
        self.policy.to_table()
    }

    /// Everything the install pipeline needs from this file.
    pub fn request(&self) -> Result<InstallRequest> {
        Ok(InstallRequest {
            hardware: self.hardware(),
            overrides: self.overrides()?,
            routing: self.routing()?,
            project_name: self.project_name.clone(),
            timezone: self.timezone.clone(),
            versions: self.versions()?,
        })
    }
}

fn keyed<V: Clone>(
    map: &BTreeMap<String, V>,
    field: &'static str,
) -> Result<BTreeMap<ServiceKind, V>> {
    map.iter()
        .map(|(name, value)| Ok((service_key(field, name)?, value.clone())))
        .collect()
}
