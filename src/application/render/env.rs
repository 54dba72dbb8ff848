//! Environment file rendering.
//!
//! The env file is the single source of values; the manifest and proxy files
//! refer to its keys by name.

use crate::domain::input::InstallInput;
use crate::domain::plan::ResourcePlan;
use crate::domain::routing::{RouteTargets, RoutingConfig};
use crate::domain::service::ServiceKind;
use crate::error::RenderError;

use super::template::{Template, Values};

pub const ENV_TEMPLATE: Template =
    Template::new("env.template", include_str!("../../../templates/env.template"));

/// Tag of the database HTTP API sidecar.
pub const DATABASE_API_VERSION: &str = "v12.2.0";
/// Memory slice of the database limit given to the API sidecar.
pub const DATABASE_API_MEMORY_MB: u64 = 256;

/// Render the env file contents.
pub fn render(
    plan: &ResourcePlan,
    routing: &RoutingConfig,
    input: &InstallInput,
) -> Result<String, RenderError> {
    ENV_TEMPLATE.render(&values(plan, routing, input)?)
}

/// Compute every env key for the given inputs.
pub fn values(
    plan: &ResourcePlan,
    routing: &RoutingConfig,
    input: &InstallInput,
) -> Result<Values, RenderError> {
    let mut values = Values::new();
    let mut set = |key: String, value: String| {
        values.insert(key, value);
    };

    set("COMPOSE_PROJECT_NAME".into(), input.project_name.clone());
    set("TZ".into(), input.timezone.clone());
    set("ROUTING_MODE".into(), routing.mode().to_string());
    set(
        "ACME_EMAIL".into(),
        routing.acme_email().unwrap_or_default().to_string(),
    );
    set(
        "ACME_CA".into(),
        routing.authority().directory_url().to_string(),
    );

    for service in ServiceKind::ALL {
        let allocation = plan.allocation(service);
        let mut memory_mb = allocation.memory_limit_mb;

        if service == ServiceKind::Database {
            let (database_mb, api_mb) = split_database_memory(memory_mb);
            memory_mb = database_mb;
            set(service.key("API_VERSION"), DATABASE_API_VERSION.into());
            set(service.key("API_MEMORY_LIMIT"), memory_limit(api_mb));
        }

        set(service.key("ENABLED"), allocation.enabled.to_string());
        set(service.key("VERSION"), input.version(service).to_string());
        set(service.key("MEMORY_LIMIT"), memory_limit(memory_mb));
        set(service.key("CPU_LIMIT"), format!("{:.2}", allocation.cpu_share));

        if service == ServiceKind::Proxy {
            continue;
        }

        let route = route_for(routing, service, allocation.enabled)?;
        set(service.key("HOST"), route.host);
        set(service.key("PATH"), route.path);
        set(service.key("PORT"), route.port);
        set(service.key("PUBLIC_URL"), route.public_url);
    }

    set(
        ServiceKind::ModelRunner.key("EXECUTION"),
        plan.model_runner_mode().to_string(),
    );

    for (key, value) in input.credentials.entries() {
        set(key.to_string(), value.to_string());
    }

    Ok(values)
}

/// Split the database allocation between Postgres and its API sidecar.
#[must_use]
pub fn split_database_memory(total_mb: u64) -> (u64, u64) {
    let api = DATABASE_API_MEMORY_MB.min(total_mb / 2);
    (total_mb - api, api)
}

fn memory_limit(mb: u64) -> String {
    format!("{mb}m")
}

#[derive(Default)]
struct Route {
    host: String,
    path: String,
    port: String,
    public_url: String,
}

fn route_for(
    routing: &RoutingConfig,
    service: ServiceKind,
    enabled: bool,
) -> Result<Route, RenderError> {
    let missing = || RenderError::MissingRoute {
        service: service.id(),
        mode: routing.mode().as_str(),
    };

    let route = match routing.targets() {
        RouteTargets::Subdomain { hosts } => match hosts.get(&service) {
            Some(host) => Route {
                host: host.clone(),
                public_url: format!("https://{host}"),
                ..Route::default()
            },
            None if enabled => return Err(missing()),
            None => Route::default(),
        },
        RouteTargets::Path {
            base_domain,
            prefixes,
        } => match prefixes.get(&service) {
            Some(prefix) => Route {
                host: base_domain.clone(),
                path: prefix.clone(),
                public_url: format!("https://{base_domain}{prefix}"),
                ..Route::default()
            },
            None if enabled => return Err(missing()),
            None => Route::default(),
        },
        RouteTargets::Port { ports } => match ports.get(&service) {
            Some(port) => Route {
                port: port.to_string(),
                public_url: format!("http://localhost:{port}"),
                ..Route::default()
            },
            None if enabled => return Err(missing()),
            None => Route::default(),
        },
    };
    Ok(route)
}
