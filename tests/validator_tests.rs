//! Input validation scenarios.

mod support;

use stackforge::application::validator::{FieldKind, InputValidator};
use stackforge::domain::issue::{has_errors, Severity};
use stackforge::domain::routing::{RoutingConfig, RoutingMode};
use stackforge::domain::service::ServiceKind;

use support::fixtures::{port_routing, subdomain_routing};

const BACKENDS: [ServiceKind; 3] = [
    ServiceKind::WorkflowEngine,
    ServiceKind::FlowBuilder,
    ServiceKind::Database,
];

#[test]
fn hostnames() {
    let validator = InputValidator::new(RoutingMode::Subdomain);
    assert!(validator.validate(FieldKind::Hostname, "a..b").is_some());
    assert!(validator.validate(FieldKind::Hostname, "-bad.example.com").is_some());
    assert!(validator.validate(FieldKind::Hostname, "localhost").is_some());
    assert!(validator.validate(FieldKind::Hostname, "192.168.1.10").is_some());
    assert!(validator
        .validate(FieldKind::Hostname, "valid-host.example.com")
        .is_none());

    let path = InputValidator::new(RoutingMode::Path);
    assert!(path.validate(FieldKind::Hostname, "192.168.1.10").is_none());
}

#[test]
fn ports_depend_on_mode() {
    let port_mode = InputValidator::new(RoutingMode::Port);
    assert!(port_mode.validate(FieldKind::Port, "99999").unwrap().is_error());
    assert!(port_mode.validate(FieldKind::Port, "0").unwrap().is_error());
    assert!(port_mode.validate(FieldKind::Port, "abc").unwrap().is_error());
    assert!(port_mode.validate(FieldKind::Port, "8080").is_none());
    assert!(port_mode.validate(FieldKind::Port, "80").unwrap().is_error());
    assert!(port_mode.validate(FieldKind::Port, "443").unwrap().is_error());

    let privileged = port_mode.validate(FieldKind::Port, "81").unwrap();
    assert_eq!(privileged.severity, Severity::Warning);

    let taken = InputValidator::new(RoutingMode::Port).with_taken_ports([8080]);
    assert!(taken.validate(FieldKind::Port, "8080").unwrap().is_error());
}

#[test]
fn emails_and_prefixes() {
    let validator = InputValidator::new(RoutingMode::Path);
    assert!(validator.validate(FieldKind::Email, "ops@example.com").is_none());
    assert!(validator.validate(FieldKind::Email, "ops@").is_some());
    assert!(validator.validate(FieldKind::Email, "no-at-sign").is_some());
    assert!(validator.validate(FieldKind::PathPrefix, "/n8n").is_none());
    assert!(validator.validate(FieldKind::PathPrefix, "/").is_some());
    assert!(validator.validate(FieldKind::PathPrefix, "n8n").is_some());
}

#[test]
fn memory_and_cpu_values() {
    let validator = InputValidator::default();
    assert!(validator.validate(FieldKind::MemorySize, "512m").is_none());
    assert!(validator.validate(FieldKind::MemorySize, "2g").is_none());
    assert!(validator.validate(FieldKind::MemorySize, "lots").is_some());
    assert!(validator.validate(FieldKind::CpuLimit, "1.5").is_none());
    assert!(validator.validate(FieldKind::CpuLimit, "-1").is_some());
}

#[test]
fn duplicate_hosts_are_rejected() {
    let mut routing = subdomain_routing("example.com");
    routing.set_host(ServiceKind::FlowBuilder, "n8n.example.com");

    let issues = InputValidator::new(RoutingMode::Subdomain).validate_routing(&routing, &BACKENDS);
    assert!(has_errors(&issues));
    assert!(issues
        .iter()
        .any(|i| i.field == "flow-builder.hostname" || i.field == "workflow-engine.hostname"));
}

#[test]
fn duplicate_ports_are_rejected() {
    let mut routing = port_routing();
    routing.set_port(ServiceKind::Database, 5678);
    let issues = InputValidator::new(RoutingMode::Port).validate_routing(&routing, &BACKENDS);
    assert!(has_errors(&issues));
}

#[test]
fn mode_switch_invalidates_previous_answers() {
    let mut routing = subdomain_routing("example.com");
    assert!(!has_errors(
        &InputValidator::new(RoutingMode::Subdomain).validate_routing(&routing, &BACKENDS)
    ));

    routing.switch_mode(RoutingMode::Port);
    assert_eq!(routing.mode(), RoutingMode::Port);
    assert!(routing.host(ServiceKind::WorkflowEngine).is_none());

    let issues = InputValidator::new(RoutingMode::Port).validate_routing(&routing, &BACKENDS);
    assert_eq!(issues.iter().filter(|i| i.is_error()).count(), BACKENDS.len());

    for service in BACKENDS {
        routing.set_port(service, service.upstream_port());
    }
    assert!(!has_errors(
        &InputValidator::new(RoutingMode::Port).validate_routing(&routing, &BACKENDS)
    ));
}

#[test]
fn subdomain_mode_requires_email() {
    let mut routing = RoutingConfig::new(RoutingMode::Subdomain);
    for service in BACKENDS {
        routing.set_host(service, format!("{}.example.com", service.default_subdomain()));
    }
    let issues = InputValidator::new(RoutingMode::Subdomain).validate_routing(&routing, &BACKENDS);
    assert!(issues.iter().any(|i| i.field == "acme-email" && i.is_error()));
}
