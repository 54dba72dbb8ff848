//! Install pipeline against the filesystem store.

mod support;

use std::collections::BTreeMap;
use std::fs;

use stackforge::adapter::outbound::artifact_store::FsArtifactStore;
use stackforge::application::budget::BudgetOverrides;
use stackforge::application::pipeline::{HardwareOverrides, InstallPipeline, InstallRequest};
use stackforge::domain::hardware::GpuVendor;
use stackforge::domain::policy::PolicyTable;
use stackforge::domain::routing::RoutingConfig;
use stackforge::domain::service::ServiceKind;
use stackforge::port::outbound::probe::FixedProbe;
use stackforge::port::outbound::store::ArtifactStore;

use support::fixtures::{host, port_routing, subdomain_routing};

fn request(routing: RoutingConfig) -> InstallRequest {
    InstallRequest {
        hardware: HardwareOverrides::default(),
        overrides: BudgetOverrides::default(),
        routing,
        project_name: "stack".into(),
        timezone: "UTC".into(),
        versions: BTreeMap::new(),
    }
}

fn site_files(root: &std::path::Path) -> Vec<String> {
    let dir = root.join("proxy/sites");
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".caddy"))
        .collect();
    names.sort();
    names
}

#[test]
fn switching_to_port_mode_clears_proxy_files() {
    let dir = tempfile::tempdir().unwrap();
    let probe = FixedProbe(host(4, 16_384, GpuVendor::None));
    let store = FsArtifactStore::new(dir.path());
    let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

    pipeline.run(&request(subdomain_routing("example.com"))).unwrap();
    assert_eq!(site_files(dir.path()).len(), 3);
    assert!(dir.path().join("proxy/Caddyfile").is_file());

    let outcome = pipeline.run(&request(port_routing())).unwrap();
    assert!(site_files(dir.path()).is_empty());
    assert!(!dir.path().join("proxy/Caddyfile").exists());
    assert_eq!(outcome.report.removed.len(), 4);

    let manifest = fs::read_to_string(dir.path().join("docker-compose.yml")).unwrap();
    assert!(!manifest.contains("\n  proxy:\n"));
}

#[test]
fn rerender_keeps_generated_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let probe = FixedProbe(host(4, 16_384, GpuVendor::None));
    let store = FsArtifactStore::new(dir.path());
    let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

    pipeline.run(&request(subdomain_routing("example.com"))).unwrap();
    let first = store.read_env().unwrap();

    pipeline.run(&request(subdomain_routing("example.org"))).unwrap();
    let second = store.read_env().unwrap();

    for key in [
        "DATABASE_PASSWORD",
        "DATABASE_JWT_SECRET",
        "WORKFLOW_ENGINE_ENCRYPTION_KEY",
        "FLOW_BUILDER_SECRET_KEY",
    ] {
        assert!(first.contains_key(key), "{key} missing");
        assert_eq!(first.get(key), second.get(key), "{key} rotated");
    }
    assert_eq!(
        second.get("WORKFLOW_ENGINE_HOST").map(String::as_str),
        Some("n8n.example.org")
    );
}

#[test]
fn identical_answers_give_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let probe = FixedProbe(host(8, 32_768, GpuVendor::Nvidia));
    let store = FsArtifactStore::new(dir.path());
    let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

    pipeline.run(&request(subdomain_routing("example.com"))).unwrap();
    let env = fs::read(dir.path().join(".env")).unwrap();
    let manifest = fs::read(dir.path().join("docker-compose.yml")).unwrap();

    pipeline.run(&request(subdomain_routing("example.com"))).unwrap();
    assert_eq!(fs::read(dir.path().join(".env")).unwrap(), env);
    assert_eq!(
        fs::read(dir.path().join("docker-compose.yml")).unwrap(),
        manifest
    );
}

#[test]
fn applied_update_survives_rerender() {
    let dir = tempfile::tempdir().unwrap();
    let probe = FixedProbe(host(8, 32_768, GpuVendor::None));
    let store = FsArtifactStore::new(dir.path());
    let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

    pipeline.run(&request(subdomain_routing("example.com"))).unwrap();
    store
        .update_env(&[("PROXY_VERSION".into(), "2.8.4-alpine".into())])
        .unwrap();

    pipeline.run(&request(subdomain_routing("example.com"))).unwrap();
    let env = store.read_env().unwrap();
    assert_eq!(
        env.get("PROXY_VERSION").map(String::as_str),
        Some("2.8.4-alpine")
    );

    let mut pinned = request(subdomain_routing("example.com"));
    pinned.versions.insert(ServiceKind::Proxy, "2.9.0-alpine".into());
    pipeline.run(&pinned).unwrap();
    let env = store.read_env().unwrap();
    assert_eq!(
        env.get("PROXY_VERSION").map(String::as_str),
        Some("2.9.0-alpine")
    );
}

#[test]
fn update_env_then_backup_round() {
    let dir = tempfile::tempdir().unwrap();
    let probe = FixedProbe(host(4, 16_384, GpuVendor::None));
    let store = FsArtifactStore::new(dir.path());
    let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());
    pipeline.run(&request(port_routing())).unwrap();

    let backup = store.backup().unwrap();
    store
        .update_env(&[("WORKFLOW_ENGINE_VERSION".into(), "9.9.9".into())])
        .unwrap();

    let env = store.read_env().unwrap();
    assert_eq!(
        env.get("WORKFLOW_ENGINE_VERSION").map(String::as_str),
        Some("9.9.9")
    );
    let saved = fs::read_to_string(backup.join(".env")).unwrap();
    assert!(!saved.contains("WORKFLOW_ENGINE_VERSION=9.9.9"));
    assert!(backup.starts_with(dir.path().join("backups")));
}
