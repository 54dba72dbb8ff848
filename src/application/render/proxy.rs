//! Proxy virtual-host rendering, one strategy per routing mode.
//!
//! - subdomain: one site file per enabled backend, each with its own `tls`
//!   directive.
//! - path: one combined site with a `handle_path` block per backend.
//! - port: nothing; services are published directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::artifact::RenderedFile;
use crate::domain::plan::ResourcePlan;
use crate::domain::routing::{RouteTargets, RoutingConfig};
use crate::domain::service::ServiceKind;
use crate::error::RenderError;

use super::template::{values, Template};

/// Global proxy options file, relative to the install root.
pub const PROXY_ROOT: &str = "proxy/Caddyfile";
/// Directory holding per-site files.
pub const SITES_DIR: &str = "proxy/sites";
/// Extension of generated site files.
pub const SITE_EXTENSION: &str = "caddy";

const ROOT: Template = Template::new(
    "proxy/Caddyfile",
    include_str!("../../../templates/proxy/Caddyfile"),
);
const SITE: Template = Template::new(
    "proxy/site.caddy",
    include_str!("../../../templates/proxy/site.caddy"),
);
const PATH_SITE: Template = Template::new(
    "proxy/path.caddy",
    include_str!("../../../templates/proxy/path.caddy"),
);
const PATH_ROUTE: Template = Template::new(
    "proxy/path-route.caddy",
    include_str!("../../../templates/proxy/path-route.caddy"),
);

/// Proxy output for one render.
#[derive(Debug, Default)]
pub struct ProxyFiles {
    pub root: Option<RenderedFile>,
    pub sites: Vec<RenderedFile>,
}

/// Render proxy files for the routing mode.
pub fn render(plan: &ResourcePlan, routing: &RoutingConfig) -> Result<ProxyFiles, RenderError> {
    let backends: Vec<ServiceKind> = plan
        .enabled_services()
        .filter(|&s| s != ServiceKind::Proxy)
        .collect();

    let sites = match routing.targets() {
        RouteTargets::Subdomain { hosts } => subdomain_sites(&backends, hosts)?,
        RouteTargets::Path {
            base_domain,
            prefixes,
        } => vec![path_site(&backends, base_domain, prefixes)?],
        RouteTargets::Port { .. } => return Ok(ProxyFiles::default()),
    };

    if routing.acme_email().map_or(true, str::is_empty) {
        return Err(RenderError::MissingAcmeEmail);
    }
    let root = ROOT.render(&values([(
        "ACME_CA",
        routing.authority().directory_url(),
    )]))?;

    Ok(ProxyFiles {
        root: Some(RenderedFile::new(PROXY_ROOT, root)),
        sites,
    })
}

fn subdomain_sites(
    backends: &[ServiceKind],
    hosts: &BTreeMap<ServiceKind, String>,
) -> Result<Vec<RenderedFile>, RenderError> {
    backends
        .iter()
        .map(|&service| {
            let host = hosts.get(&service).ok_or(RenderError::MissingRoute {
                service: service.id(),
                mode: "subdomain",
            })?;
            let contents = SITE.render(&values([
                ("SERVICE", service.label().to_string()),
                ("HOST", host.clone()),
                ("UPSTREAM", upstream(service)),
            ]))?;
            Ok(RenderedFile::new(site_path(service.id()), contents))
        })
        .collect()
}

fn path_site(
    backends: &[ServiceKind],
    domain: &str,
    prefixes: &BTreeMap<ServiceKind, String>,
) -> Result<RenderedFile, RenderError> {
    let routes = backends
        .iter()
        .map(|&service| {
            let prefix = prefixes.get(&service).ok_or(RenderError::MissingRoute {
                service: service.id(),
                mode: "path",
            })?;
            PATH_ROUTE.render(&values([
                ("SERVICE", service.label().to_string()),
                ("PREFIX", prefix.clone()),
                ("UPSTREAM", upstream(service)),
            ]))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join("\n");

    let contents = PATH_SITE.render(&values([
        ("DOMAIN", domain.to_string()),
        ("ROUTES", routes),
    ]))?;
    Ok(RenderedFile::new(site_path("stack"), contents))
}

fn upstream(service: ServiceKind) -> String {
    format!("{}:{}", service.upstream_host(), service.upstream_port())
}

/// Path of a site file relative to the install root.
#[must_use]
pub fn site_path(name: &str) -> PathBuf {
    Path::new(SITES_DIR).join(format!("{name}.{SITE_EXTENSION}"))
}
