//! How external requests reach each backend.
//!
//! Route targets are scoped to a mode: hostnames belong to subdomain mode,
//! path prefixes to path mode, host ports to port mode. Switching mode drops
//! the targets of the previous mode instead of carrying them over.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::service::ServiceKind;

/// Routing strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// One hostname per service.
    #[default]
    Subdomain,
    /// One hostname, one path prefix per service.
    Path,
    /// Services bound directly to host ports; no proxy.
    Port,
}

impl RoutingMode {
    pub const ALL: [RoutingMode; 3] = [Self::Subdomain, Self::Path, Self::Port];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subdomain => "subdomain",
            Self::Path => "path",
            Self::Port => "port",
        }
    }

    /// Whether the proxy is part of the stack in this mode.
    #[must_use]
    pub const fn uses_proxy(self) -> bool {
        !matches!(self, Self::Port)
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subdomain" | "domain" | "domains" => Ok(Self::Subdomain),
            "path" | "paths" => Ok(Self::Path),
            "port" | "ports" => Ok(Self::Port),
            _ => Err(DomainError::UnknownRoutingMode {
                value: s.to_string(),
            }),
        }
    }
}

/// ACME certificate authority used by the proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateAuthority {
    #[default]
    #[serde(rename = "letsencrypt")]
    LetsEncrypt,
    #[serde(rename = "letsencrypt-staging")]
    LetsEncryptStaging,
    #[serde(rename = "zerossl")]
    ZeroSsl,
    Buypass,
}

impl CertificateAuthority {
    pub const ALL: [CertificateAuthority; 4] = [
        Self::LetsEncrypt,
        Self::LetsEncryptStaging,
        Self::ZeroSsl,
        Self::Buypass,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LetsEncrypt => "letsencrypt",
            Self::LetsEncryptStaging => "letsencrypt-staging",
            Self::ZeroSsl => "zerossl",
            Self::Buypass => "buypass",
        }
    }

    /// ACME directory URL written as the proxy's `acme_ca`.
    #[must_use]
    pub const fn directory_url(self) -> &'static str {
        match self {
            Self::LetsEncrypt => "https://acme-v02.api.letsencrypt.org/directory",
            Self::LetsEncryptStaging => "https://acme-staging-v02.api.letsencrypt.org/directory",
            Self::ZeroSsl => "https://acme.zerossl.com/v2/DV90",
            Self::Buypass => "https://api.buypass.com/acme/directory",
        }
    }
}

impl fmt::Display for CertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateAuthority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letsencrypt" | "lets-encrypt" => Ok(Self::LetsEncrypt),
            "letsencrypt-staging" | "staging" => Ok(Self::LetsEncryptStaging),
            "zerossl" => Ok(Self::ZeroSsl),
            "buypass" => Ok(Self::Buypass),
            _ => Err(DomainError::UnknownCertificateAuthority {
                value: s.to_string(),
            }),
        }
    }
}

/// Mode-scoped route targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTargets {
    Subdomain {
        hosts: BTreeMap<ServiceKind, String>,
    },
    Path {
        base_domain: String,
        prefixes: BTreeMap<ServiceKind, String>,
    },
    Port {
        ports: BTreeMap<ServiceKind, u16>,
    },
}

impl RouteTargets {
    /// Empty targets for `mode`.
    #[must_use]
    pub fn empty(mode: RoutingMode) -> Self {
        match mode {
            RoutingMode::Subdomain => Self::Subdomain {
                hosts: BTreeMap::new(),
            },
            RoutingMode::Path => Self::Path {
                base_domain: String::new(),
                prefixes: BTreeMap::new(),
            },
            RoutingMode::Port => Self::Port {
                ports: BTreeMap::new(),
            },
        }
    }

    #[must_use]
    pub const fn mode(&self) -> RoutingMode {
        match self {
            Self::Subdomain { .. } => RoutingMode::Subdomain,
            Self::Path { .. } => RoutingMode::Path,
            Self::Port { .. } => RoutingMode::Port,
        }
    }
}

/// The user's routing choice plus certificate settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    targets: RouteTargets,
    acme_email: Option<String>,
    authority: CertificateAuthority,
}

impl RoutingConfig {
    /// Empty configuration for `mode`.
    #[must_use]
    pub fn new(mode: RoutingMode) -> Self {
        Self {
            targets: RouteTargets::empty(mode),
            acme_email: None,
            authority: CertificateAuthority::default(),
        }
    }

    #[must_use]
    pub fn with_targets(targets: RouteTargets) -> Self {
        Self {
            targets,
            acme_email: None,
            authority: CertificateAuthority::default(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> RoutingMode {
        self.targets.mode()
    }

    #[must_use]
    pub fn targets(&self) -> &RouteTargets {
        &self.targets
    }

    /// Change the mode. Targets of the previous mode are discarded; asking
    /// for the current mode keeps them.
    pub fn switch_mode(&mut self, mode: RoutingMode) {
        if self.mode() != mode {
            self.targets = RouteTargets::empty(mode);
        }
    }

    /// Set the hostname for `service`. Returns false outside subdomain mode.
    pub fn set_host(&mut self, service: ServiceKind, host: impl Into<String>) -> bool {
        match &mut self.targets {
            RouteTargets::Subdomain { hosts } => {
                hosts.insert(service, host.into());
                true
            }
            _ => false,
        }
    }

    /// Set the shared domain. Returns false outside path mode.
    pub fn set_base_domain(&mut self, domain: impl Into<String>) -> bool {
        match &mut self.targets {
            RouteTargets::Path { base_domain, .. } => {
                *base_domain = domain.into();
                true
            }
            _ => false,
        }
    }

    /// Set the path prefix for `service`. Returns false outside path mode.
    pub fn set_prefix(&mut self, service: ServiceKind, prefix: impl Into<String>) -> bool {
        match &mut self.targets {
            RouteTargets::Path { prefixes, .. } => {
                prefixes.insert(service, prefix.into());
                true
            }
            _ => false,
        }
    }

    /// Set the host port for `service`. Returns false outside port mode.
    pub fn set_port(&mut self, service: ServiceKind, port: u16) -> bool {
        match &mut self.targets {
            RouteTargets::Port { ports } => {
                ports.insert(service, port);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn host(&self, service: ServiceKind) -> Option<&str> {
        match &self.targets {
            RouteTargets::Subdomain { hosts } => hosts.get(&service).map(String::as_str),
            _ => None,
        }
    }

    #[must_use]
    pub fn prefix(&self, service: ServiceKind) -> Option<&str> {
        match &self.targets {
            RouteTargets::Path { prefixes, .. } => prefixes.get(&service).map(String::as_str),
            _ => None,
        }
    }

    #[must_use]
    pub fn port(&self, service: ServiceKind) -> Option<u16> {
        match &self.targets {
            RouteTargets::Port { ports } => ports.get(&service).copied(),
            _ => None,
        }
    }

    #[must_use]
    pub fn acme_email(&self) -> Option<&str> {
        self.acme_email.as_deref()
    }

    pub fn set_acme_email(&mut self, email: impl Into<String>) {
        self.acme_email = Some(email.into());
    }

    #[must_use]
    pub const fn authority(&self) -> CertificateAuthority {
        self.authority
    }

    pub fn set_authority(&mut self, authority: CertificateAuthority) {
        self.authority = authority;
    }

    /// URL where `service` is reachable once the stack is up.
    #[must_use]
    pub fn endpoint(&self, service: ServiceKind) -> Option<String> {
        match &self.targets {
            RouteTargets::Subdomain { hosts } => {
                hosts.get(&service).map(|host| format!("https://{host}"))
            }
            RouteTargets::Path {
                base_domain,
                prefixes,
            } => prefixes
                .get(&service)
                .map(|prefix| format!("https://{base_domain}{prefix}/")),
            RouteTargets::Port { ports } => {
                ports.get(&service).map(|port| format!("http://localhost:{port}"))
            }
        }
    }
}
