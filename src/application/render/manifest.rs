//! Orchestration manifest rendering.

use crate::domain::plan::{ExecutionMode, ResourcePlan};
use crate::domain::routing::{RoutingConfig, RoutingMode};
use crate::domain::service::ServiceKind;
use crate::error::RenderError;

use super::template::{values, Template};

const MANIFEST: Template = Template::new(
    "compose/manifest.yml",
    include_str!("../../../templates/compose/manifest.yml"),
);
const WORKFLOW_ENGINE: Template = Template::new(
    "compose/workflow-engine.yml",
    include_str!("../../../templates/compose/workflow-engine.yml"),
);
const FLOW_BUILDER: Template = Template::new(
    "compose/flow-builder.yml",
    include_str!("../../../templates/compose/flow-builder.yml"),
);
const DATABASE: Template = Template::new(
    "compose/database.yml",
    include_str!("../../../templates/compose/database.yml"),
);
const MODEL_RUNNER: Template = Template::new(
    "compose/model-runner.yml",
    include_str!("../../../templates/compose/model-runner.yml"),
);
const PROXY: Template = Template::new(
    "compose/proxy.yml",
    include_str!("../../../templates/compose/proxy.yml"),
);

const GPU_NVIDIA: &str = include_str!("../../../templates/compose/gpu-nvidia.yml");
const GPU_GENERIC: &str = include_str!("../../../templates/compose/gpu-generic.yml");
const CPU_TUNING: &str = include_str!("../../../templates/compose/cpu-tuning.yml");

/// Services included in the manifest: enabled in the plan, and the proxy
/// only when the routing mode uses it.
pub fn manifest_services(plan: &ResourcePlan, mode: RoutingMode) -> Vec<ServiceKind> {
    plan.enabled_services()
        .filter(|&s| s != ServiceKind::Proxy || mode.uses_proxy())
        .collect()
}

/// Render the manifest contents.
pub fn render(plan: &ResourcePlan, routing: &RoutingConfig) -> Result<String, RenderError> {
    let mode = routing.mode();
    let services = manifest_services(plan, mode);

    let mut blocks = Vec::with_capacity(services.len());
    let mut volumes = String::new();
    for &service in &services {
        blocks.push(render_service(service, plan, &services, mode)?);
        for volume in volumes_for(service) {
            volumes.push_str(&format!("  {volume}:\n"));
        }
    }

    MANIFEST.render(&values([
        ("SERVICES", blocks.join("\n")),
        ("VOLUMES", volumes),
    ]))
}

fn render_service(
    service: ServiceKind,
    plan: &ResourcePlan,
    included: &[ServiceKind],
    mode: RoutingMode,
) -> Result<String, RenderError> {
    let ports = ports_block(service, mode);
    match service {
        ServiceKind::WorkflowEngine => WORKFLOW_ENGINE.render(&values([("PORTS", ports)])),
        ServiceKind::FlowBuilder => FLOW_BUILDER.render(&values([("PORTS", ports)])),
        ServiceKind::Database => DATABASE.render(&values([("PORTS", ports)])),
        ServiceKind::ModelRunner => {
            let execution = plan.model_runner_mode();
            let (devices, reservations, tuning) = match execution {
                ExecutionMode::GpuNvidia => ("", GPU_NVIDIA, ""),
                ExecutionMode::GpuGeneric => (GPU_GENERIC, "", ""),
                ExecutionMode::CpuOnly => ("", "", CPU_TUNING),
            };
            MODEL_RUNNER.render(&values([
                ("PORTS", ports),
                ("EXECUTION", execution.to_string()),
                ("DEVICES", devices.to_string()),
                ("RESERVATIONS", reservations.to_string()),
                ("TUNING", tuning.to_string()),
            ]))
        }
        ServiceKind::Proxy => {
            let depends: String = included
                .iter()
                .filter(|&&s| s != ServiceKind::Proxy)
                .map(|s| format!("      - {}\n", s.upstream_host()))
                .collect();
            PROXY.render(&values([("DEPENDS", depends)]))
        }
    }
}

fn ports_block(service: ServiceKind, mode: RoutingMode) -> String {
    if mode != RoutingMode::Port || service == ServiceKind::Proxy {
        return String::new();
    }
    format!(
        "    ports:\n      - \"${{{}}}:{}\"\n",
        service.key("PORT"),
        service.upstream_port()
    )
}

fn volumes_for(service: ServiceKind) -> &'static [&'static str] {
    match service {
        ServiceKind::WorkflowEngine => &["workflow-engine-data"],
        ServiceKind::FlowBuilder => &["flow-builder-data"],
        ServiceKind::Database => &["database-data"],
        ServiceKind::ModelRunner => &["model-runner-data"],
        ServiceKind::Proxy => &["proxy-data", "proxy-config"],
    }
}
