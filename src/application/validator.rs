//! Field-level and routing-level input validation.
//!
//! Validation is pure: the same validator and input always produce the same
//! verdict, and nothing is mutated.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

use crate::domain::issue::ValidationIssue;
use crate::domain::routing::{RouteTargets, RoutingConfig, RoutingMode};
use crate::domain::service::ServiceKind;

/// Ports the proxy listens on.
pub const PROXY_PORTS: [u16; 2] = [80, 443];

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;
const MAX_MEMORY_MB: f64 = 128.0 * 1024.0;
const MAX_CPU: f64 = 32.0;
const API_KEY_LEN: std::ops::RangeInclusive<usize> = 16..=256;

/// Kinds of user-supplied values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Hostname,
    Email,
    Port,
    RoutingMode,
    PathPrefix,
    MemorySize,
    CpuLimit,
    ApiKey,
    Timezone,
}

impl FieldKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hostname => "hostname",
            Self::Email => "email",
            Self::Port => "port",
            Self::RoutingMode => "routing-mode",
            Self::PathPrefix => "path-prefix",
            Self::MemorySize => "memory-size",
            Self::CpuLimit => "cpu-limit",
            Self::ApiKey => "api-key",
            Self::Timezone => "timezone",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates input in the context of a routing mode.
#[derive(Debug, Clone, Default)]
pub struct InputValidator {
    mode: RoutingMode,
    taken_ports: BTreeSet<u16>,
}

impl InputValidator {
    #[must_use]
    pub fn new(mode: RoutingMode) -> Self {
        Self {
            mode,
            taken_ports: BTreeSet::new(),
        }
    }

    /// Ports already assigned to other services; reusing one is an error.
    #[must_use]
    pub fn with_taken_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.taken_ports = ports.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Validate one value. `None` means the value is acceptable as is.
    #[must_use]
    pub fn validate(&self, kind: FieldKind, value: &str) -> Option<ValidationIssue> {
        let field = kind.as_str();
        let result = match kind {
            FieldKind::Hostname => self.check_hostname(value),
            FieldKind::Email => check_email(value),
            FieldKind::Port => return self.check_port(value),
            FieldKind::RoutingMode => value
                .parse::<RoutingMode>()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            FieldKind::PathPrefix => check_path_prefix(value),
            FieldKind::MemorySize => parse_memory_mb(value).map(|_| ()),
            FieldKind::CpuLimit => parse_cpu_limit(value).map(|_| ()),
            FieldKind::ApiKey => check_api_key(value),
            FieldKind::Timezone => check_timezone(value),
        };
        result.err().map(|message| ValidationIssue::error(field, message))
    }

    fn check_hostname(&self, value: &str) -> Result<(), String> {
        let host = value.trim();
        if host.is_empty() {
            return Err("hostname cannot be empty".into());
        }
        if host.contains("://") {
            return Err("enter a bare hostname without a scheme".into());
        }
        if host.parse::<IpAddr>().is_ok() {
            if self.mode == RoutingMode::Subdomain {
                return Err("subdomain routing needs a DNS name, not an IP address".into());
            }
            return Ok(());
        }
        if host.len() > MAX_HOSTNAME_LEN {
            return Err(format!("hostname exceeds {MAX_HOSTNAME_LEN} characters"));
        }
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return Err("hostname needs at least one dot, e.g. n8n.example.com".into());
        }
        for label in labels {
            check_label(label)?;
        }
        Ok(())
    }

    fn check_port(&self, value: &str) -> Option<ValidationIssue> {
        let field = FieldKind::Port.as_str();
        let port = match value.trim().parse::<u32>() {
            Ok(port) => port,
            Err(_) => return Some(ValidationIssue::error(field, "port must be a number")),
        };
        if !(1..=65535).contains(&port) {
            return Some(ValidationIssue::error(field, "port must be between 1 and 65535"));
        }
        let port = port as u16;
        if self.mode == RoutingMode::Port && PROXY_PORTS.contains(&port) {
            return Some(ValidationIssue::error(
                field,
                format!("port {port} is reserved for the proxy"),
            ));
        }
        if self.taken_ports.contains(&port) {
            return Some(ValidationIssue::error(
                field,
                format!("port {port} is already assigned to another service"),
            ));
        }
        if port < 1024 {
            return Some(ValidationIssue::warning(
                field,
                format!("port {port} is privileged and needs root to bind"),
            ));
        }
        None
    }

    /// Validate a complete routing configuration for the enabled services.
    #[must_use]
    pub fn validate_routing(
        &self,
        routing: &RoutingConfig,
        enabled: &[ServiceKind],
    ) -> Vec<ValidationIssue> {
        let scoped = Self {
            mode: routing.mode(),
            taken_ports: self.taken_ports.clone(),
        };
        let mut issues = Vec::new();
        let backends: Vec<ServiceKind> = enabled
            .iter()
            .copied()
            .filter(|s| *s != ServiceKind::Proxy)
            .collect();

        match routing.targets() {
            RouteTargets::Subdomain { hosts } => {
                let mut seen = BTreeMap::new();
                for &service in &backends {
                    let field = format!("{service}.hostname");
                    let Some(host) = hosts.get(&service) else {
                        issues.push(ValidationIssue::error(field, "no hostname configured"));
                        continue;
                    };
                    if let Some(issue) = scoped.validate(FieldKind::Hostname, host) {
                        issues.push(issue.relabel(field));
                        continue;
                    }
                    let key = host.trim().to_ascii_lowercase();
                    if let Some(other) = seen.insert(key, service) {
                        issues.push(ValidationIssue::error(
                            field,
                            format!("hostname {host} is already used by {other}"),
                        ));
                    }
                }
            }
            RouteTargets::Path {
                base_domain,
                prefixes,
            } => {
                if let Some(issue) = scoped.validate(FieldKind::Hostname, base_domain) {
                    issues.push(issue.relabel("domain".to_string()));
                }
                let mut seen = BTreeMap::new();
                for &service in &backends {
                    let field = format!("{service}.path");
                    let Some(prefix) = prefixes.get(&service) else {
                        issues.push(ValidationIssue::error(field, "no path prefix configured"));
                        continue;
                    };
                    if let Some(issue) = scoped.validate(FieldKind::PathPrefix, prefix) {
                        issues.push(issue.relabel(field));
                        continue;
                    }
                    if let Some(other) = seen.insert(prefix.to_ascii_lowercase(), service) {
                        issues.push(ValidationIssue::error(
                            field,
                            format!("path {prefix} is already used by {other}"),
                        ));
                        continue;
                    }
                    if !service.supports_path_prefix() {
                        issues.push(ValidationIssue::warning(
                            field,
                            format!("{service} does not serve correctly below a path prefix"),
                        ));
                    }
                }
            }
            RouteTargets::Port { ports } => {
                let mut seen: BTreeMap<u16, ServiceKind> = BTreeMap::new();
                for &service in &backends {
                    let field = format!("{service}.port");
                    let Some(&port) = ports.get(&service) else {
                        issues.push(ValidationIssue::error(field, "no host port configured"));
                        continue;
                    };
                    let validator = scoped.clone().with_taken_ports(seen.keys().copied());
                    if let Some(issue) = validator.validate(FieldKind::Port, &port.to_string()) {
                        let blocking = issue.is_error();
                        issues.push(issue.relabel(field));
                        if blocking {
                            continue;
                        }
                    }
                    seen.insert(port, service);
                }
            }
        }

        if routing.mode().uses_proxy() {
            match routing.acme_email() {
                Some(email) => {
                    if let Some(issue) = scoped.validate(FieldKind::Email, email) {
                        issues.push(issue.relabel("acme-email".to_string()));
                    }
                }
                None => issues.push(ValidationIssue::error(
                    "acme-email",
                    "an email is required for certificate registration",
                )),
            }
        }

        issues
    }
}

fn check_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("hostname has an empty label (consecutive or trailing dots)".into());
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(format!("label '{label}' exceeds {MAX_LABEL_LEN} characters"));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!(
            "label '{label}' may only contain letters, digits and hyphens"
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!("label '{label}' cannot start or end with a hyphen"));
    }
    Ok(())
}

fn check_email(value: &str) -> Result<(), String> {
    let email = value.trim();
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("email must contain exactly one @".into());
    };
    if local.is_empty() {
        return Err("email is missing the part before @".into());
    }
    if domain.is_empty() {
        return Err("email is missing the domain".into());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(format!("email domain '{domain}' must contain a dot"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err("email cannot contain spaces".into());
    }
    Ok(())
}

fn check_path_prefix(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !value.starts_with('/') {
        return Err("path must start with /".into());
    }
    if value == "/" {
        return Err("the root path cannot be assigned to a single service".into());
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/' || c == '-')
    {
        return Err("path may only contain lowercase letters, digits, / and -".into());
    }
    if value.ends_with('/') {
        return Err("path cannot end with /".into());
    }
    if value.contains("//") {
        return Err("path cannot contain empty segments".into());
    }
    Ok(())
}

fn check_api_key(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if len == 0 {
        return Err("API key cannot be empty".into());
    }
    if !API_KEY_LEN.contains(&len) {
        return Err(format!(
            "API key must be {} to {} characters",
            API_KEY_LEN.start(),
            API_KEY_LEN.end()
        ));
    }
    Ok(())
}

/// IANA zone names (`Europe/Berlin`, `America/Argentina/Buenos_Aires`) and
/// offset forms such as `Etc/GMT+3`.
pub fn check_timezone(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("timezone cannot be empty".into());
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'))
    {
        return Err("timezone may only contain letters, digits, /, _, - and +".into());
    }
    if value.starts_with('/') || value.ends_with('/') || value.contains("//") {
        return Err(format!("'{value}' is not a timezone name"));
    }
    Ok(())
}

/// Parse a memory size such as `512m`, `2g` or `1.5gb` into megabytes.
/// A bare number is read as gigabytes.
pub fn parse_memory_mb(value: &str) -> Result<u64, String> {
    let text = value.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err("memory size cannot be empty".into());
    }
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let amount: f64 = number
        .parse()
        .map_err(|_| "use a size such as 512m, 2g or 1.5g".to_string())?;
    let megabytes = match unit.trim() {
        "" | "g" | "gb" => amount * 1024.0,
        "m" | "mb" => amount,
        "k" | "kb" => amount / 1024.0,
        _ => return Err("use a size such as 512m, 2g or 1.5g".into()),
    };
    if megabytes <= 0.0 {
        return Err("memory size must be greater than zero".into());
    }
    if megabytes > MAX_MEMORY_MB {
        return Err("memory size cannot exceed 128 GB".into());
    }
    Ok(megabytes.floor().max(1.0) as u64)
}

/// Parse a CPU limit in cores.
pub fn parse_cpu_limit(value: &str) -> Result<f64, String> {
    let cores: f64 = value
        .trim()
        .parse()
        .map_err(|_| "CPU limit must be a number".to_string())?;
    if !cores.is_finite() || cores <= 0.0 {
        return Err("CPU limit must be greater than zero".into());
    }
    if cores > MAX_CPU {
        return Err("CPU limit cannot exceed 32 cores".into());
    }
    Ok(cores)
}
