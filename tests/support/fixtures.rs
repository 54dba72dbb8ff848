use std::collections::{BTreeMap, HashMap};

use stackforge::application::budget::{BudgetOverrides, ResourceBudgeter};
use stackforge::domain::hardware::{GpuInfo, GpuVendor, HardwareFacts, OsFamily};
use stackforge::domain::input::{Credentials, InstallInput};
use stackforge::domain::plan::ResourcePlan;
use stackforge::domain::policy::PolicyTable;
use stackforge::domain::routing::{RoutingConfig, RoutingMode};
use stackforge::domain::service::ServiceKind;

pub fn host(cores: u32, memory_mb: u64, gpu: GpuVendor) -> HardwareFacts {
    HardwareFacts::new(
        cores,
        memory_mb,
        Some(200_000),
        GpuInfo::from_vendor(gpu),
        OsFamily::Linux,
    )
}

pub fn plan(facts: &HardwareFacts, overrides: &BudgetOverrides) -> ResourcePlan {
    ResourceBudgeter::new(PolicyTable::default()).plan(facts, overrides)
}

pub fn input() -> InstallInput {
    InstallInput {
        project_name: "stack".into(),
        timezone: "UTC".into(),
        versions: BTreeMap::new(),
        credentials: Credentials {
            database_password: "p".repeat(32),
            jwt_secret: "j".repeat(64),
            workflow_encryption_key: "w".repeat(64),
            flow_builder_secret_key: "f".repeat(64),
        },
    }
}

pub fn subdomain_routing(domain: &str) -> RoutingConfig {
    let mut routing = RoutingConfig::new(RoutingMode::Subdomain);
    for service in ServiceKind::BACKENDS {
        routing.set_host(service, format!("{}.{domain}", service.default_subdomain()));
    }
    routing.set_acme_email(format!("ops@{domain}"));
    routing
}

pub fn path_routing(domain: &str) -> RoutingConfig {
    let mut routing = RoutingConfig::new(RoutingMode::Path);
    routing.set_base_domain(domain);
    for service in ServiceKind::BACKENDS {
        routing.set_prefix(service, service.default_path_prefix());
    }
    routing.set_acme_email(format!("ops@{domain}"));
    routing
}

pub fn port_routing() -> RoutingConfig {
    let mut routing = RoutingConfig::new(RoutingMode::Port);
    for service in ServiceKind::BACKENDS {
        routing.set_port(service, service.upstream_port());
    }
    routing
}

/// Parse env text into a map. Comments and blank lines are skipped.
pub fn parse_env(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

pub const SUBDOMAIN_ANSWERS: &str = r#"
project_name = "stack"

[routing]
mode = "subdomain"
domain = "example.com"
acme_email = "ops@example.com"

[services]
force_cpu_model_runner = true

[hardware]
cpu_cores = 8
memory_mb = 32768
free_disk_mb = 200000
gpu = "none"
"#;

pub const PORT_ANSWERS: &str = r#"
[routing]
mode = "port"

[routing.ports]
database = 8000

[hardware]
cpu_cores = 4
memory_mb = 16384
free_disk_mb = 100000
gpu = "none"
"#;

pub const TINY_HOST_ANSWERS: &str = r#"
[routing]
mode = "port"

[hardware]
cpu_cores = 1
memory_mb = 1024
free_disk_mb = 100000
"#;
