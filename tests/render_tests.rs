//! Rendering across routing modes.

mod support;

use std::collections::BTreeSet;

use stackforge::application::budget::BudgetOverrides;
use stackforge::application::render::ArtifactRenderer;
use stackforge::domain::hardware::GpuVendor;
use stackforge::domain::routing::{CertificateAuthority, RoutingMode};
use stackforge::domain::service::ServiceKind;
use stackforge::error::RenderError;

use support::fixtures::{
    host, input, parse_env, path_routing, plan, port_routing, subdomain_routing,
};

fn no_placeholders(text: &str) {
    assert!(!text.contains("{{"), "unresolved placeholder in:\n{text}");
}

#[test]
fn subdomain_mode_writes_one_site_per_backend() {
    let facts = host(4, 16_384, GpuVendor::None);
    let plan = plan(&facts, &BudgetOverrides::default());
    let enabled_backends: Vec<ServiceKind> = plan
        .enabled_services()
        .filter(|s| *s != ServiceKind::Proxy)
        .collect();
    assert_eq!(enabled_backends.len(), 3);

    let artifacts = ArtifactRenderer::new()
        .render(&plan, &subdomain_routing("example.com"), &input())
        .unwrap();

    assert_eq!(artifacts.virtual_host_count(), 3);
    let hosts: BTreeSet<String> = artifacts
        .virtual_hosts
        .iter()
        .map(|site| {
            site.contents()
                .lines()
                .find(|l| l.ends_with(" {") && !l.starts_with('\t'))
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(hosts.len(), 3, "hostnames must be distinct: {hosts:?}");
    for site in &artifacts.virtual_hosts {
        assert!(site.contents().contains("tls {$ACME_EMAIL}"));
        no_placeholders(site.contents());
    }
    assert!(artifacts.proxy_root.is_some());
    assert!(artifacts.manifest.contents().contains("\n  proxy:\n"));
}

#[test]
fn port_mode_drops_proxy_entirely() {
    let facts = host(4, 16_384, GpuVendor::None);
    let overrides = BudgetOverrides {
        without_proxy: true,
        ..BudgetOverrides::default()
    };
    let plan = plan(&facts, &overrides);
    let artifacts = ArtifactRenderer::new()
        .render(&plan, &port_routing(), &input())
        .unwrap();

    assert_eq!(artifacts.virtual_host_count(), 0);
    assert!(artifacts.proxy_root.is_none());
    let manifest = artifacts.manifest.contents();
    assert!(!manifest.contains("\n  proxy:\n"));
    assert!(!manifest.contains("caddy:"));
    assert!(manifest.contains("${WORKFLOW_ENGINE_PORT}"));
    no_placeholders(manifest);

    let env = parse_env(artifacts.env.contents());
    assert_eq!(env.get("WORKFLOW_ENGINE_PORT").map(String::as_str), Some("5678"));
}

#[test]
fn path_mode_writes_one_combined_site() {
    let facts = host(8, 32_768, GpuVendor::Nvidia);
    let plan = plan(&facts, &BudgetOverrides::default());
    let artifacts = ArtifactRenderer::new()
        .render(&plan, &path_routing("ai.example.com"), &input())
        .unwrap();

    assert_eq!(artifacts.virtual_host_count(), 1);
    let site = artifacts.virtual_hosts[0].contents();
    assert!(site.starts_with("# Path routing"));
    assert!(site.contains("ai.example.com {"));
    for service in plan.enabled_services().filter(|s| *s != ServiceKind::Proxy) {
        assert!(site.contains(service.default_path_prefix()), "{service} route missing");
    }
    no_placeholders(site);
}

#[test]
fn rendering_is_byte_identical() {
    let facts = host(8, 32_768, GpuVendor::Nvidia);
    let plan = plan(&facts, &BudgetOverrides::default());
    let routing = subdomain_routing("example.com");
    let first = ArtifactRenderer::new().render(&plan, &routing, &input()).unwrap();
    let second = ArtifactRenderer::new().render(&plan, &routing, &input()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn forced_cpu_runner_is_flagged_in_manifest() {
    let facts = host(8, 32_768, GpuVendor::None);
    let overrides = BudgetOverrides {
        force_cpu_model_runner: true,
        ..BudgetOverrides::default()
    };
    let plan = plan(&facts, &overrides);
    let artifacts = ArtifactRenderer::new()
        .render(&plan, &subdomain_routing("example.com"), &input())
        .unwrap();

    let manifest = artifacts.manifest.contents();
    assert!(manifest.contains("  model-runner:\n"));
    assert!(manifest.contains("cpu-only"));
    assert!(!manifest.contains("driver: nvidia"));
    assert!(!manifest.contains("/dev/dri"));
    no_placeholders(manifest);
}

#[test]
fn small_host_renders_without_gpu_fields() {
    let facts = host(2, 4096, GpuVendor::None);
    let plan = plan(&facts, &BudgetOverrides::default());
    let artifacts = ArtifactRenderer::new()
        .render(&plan, &subdomain_routing("example.com"), &input())
        .unwrap();

    let manifest = artifacts.manifest.contents();
    assert!(!manifest.contains("model-runner:"));
    assert!(!manifest.contains("ollama/ollama"));
    no_placeholders(manifest);
    no_placeholders(artifacts.env.contents());
}

#[test]
fn env_file_carries_limits_and_flags() {
    let facts = host(4, 16_384, GpuVendor::None);
    let plan = plan(&facts, &BudgetOverrides::default());
    let artifacts = ArtifactRenderer::new()
        .render(&plan, &subdomain_routing("example.com"), &input())
        .unwrap();
    let env = parse_env(artifacts.env.contents());

    assert_eq!(env.get("ROUTING_MODE").map(String::as_str), Some(RoutingMode::Subdomain.as_str()));
    assert_eq!(env.get("WORKFLOW_ENGINE_ENABLED").map(String::as_str), Some("true"));
    assert_eq!(env.get("MODEL_RUNNER_ENABLED").map(String::as_str), Some("false"));
    assert_eq!(env.get("DATABASE_PASSWORD").map(String::len), Some(32));
    let limit = plan.allocation(ServiceKind::WorkflowEngine).memory_limit_mb;
    assert_eq!(
        env.get("WORKFLOW_ENGINE_MEMORY_LIMIT").map(String::as_str),
        Some(format!("{limit}m").as_str())
    );
}

#[test]
fn missing_email_is_a_render_error() {
    let facts = host(4, 16_384, GpuVendor::None);
    let plan = plan(&facts, &BudgetOverrides::default());
    let mut routing = subdomain_routing("example.com");
    routing.set_acme_email("");
    let err = ArtifactRenderer::new()
        .render(&plan, &routing, &input())
        .unwrap_err();
    assert_eq!(err, RenderError::MissingAcmeEmail);
}

#[test]
fn authority_lands_in_proxy_root() {
    let facts = host(4, 16_384, GpuVendor::None);
    let plan = plan(&facts, &BudgetOverrides::default());
    let mut routing = subdomain_routing("example.com");
    routing.set_authority(CertificateAuthority::LetsEncryptStaging);
    let artifacts = ArtifactRenderer::new().render(&plan, &routing, &input()).unwrap();
    let root = artifacts.proxy_root.unwrap();
    assert!(root
        .contents()
        .contains(CertificateAuthority::LetsEncryptStaging.directory_url()));
}
