//! Interactive install wizard.
//!
//! Walks through services, routing and certificates, records every answer
//! in the answers file, then renders and writes the stack. Re-running the
//! wizard starts from the previous answers and keeps existing credentials.

use std::collections::BTreeSet;
use std::path::Path;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use super::command::InstallArgs;
use super::render::summarize;
use super::{detect, output, paths, plan, stack};
use crate::adapter::outbound::artifact_store::{write_atomic, FsArtifactStore};
use crate::adapter::outbound::host::HostProbe;
use crate::application::pipeline::{InstallPipeline, PreparedInstall};
use crate::application::render::MANIFEST_FILE;
use crate::application::validator::{FieldKind, InputValidator};
use crate::domain::issue::has_errors;
use crate::domain::routing::{CertificateAuthority, RoutingMode};
use crate::domain::service::ServiceKind;
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::settings::{Config, RoutingSection};
use crate::port::outbound::orchestrator::Orchestrator;

fn confirm(theme: &ColorfulTheme, prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Warning the user has to accept before `value` is kept.
fn pending_warning(validator: &InputValidator, kind: FieldKind, value: &str) -> Option<String> {
    validator
        .validate(kind, value)
        .filter(|issue| !issue.is_error())
        .map(|issue| issue.message)
}

/// Prompt until `kind` validates without errors. A value with a warning is
/// kept only once the user confirms it; otherwise the prompt repeats.
fn prompt_field(
    theme: &ColorfulTheme,
    prompt: &str,
    default: Option<String>,
    validator: &InputValidator,
    kind: FieldKind,
) -> Result<String> {
    loop {
        let mut input = Input::<String>::with_theme(theme).with_prompt(prompt);
        if let Some(default) = &default {
            input = input.default(default.clone());
        }
        let value = input
            .validate_with(|value: &String| -> std::result::Result<(), String> {
                match validator.validate(kind, value) {
                    Some(issue) if issue.is_error() => Err(issue.message),
                    _ => Ok(()),
                }
            })
            .interact_text()?;
        let Some(warning) = pending_warning(validator, kind, &value) else {
            return Ok(value.trim().to_string());
        };
        output::warning(&warning);
        if confirm(theme, "Use this value anyway?", false)? {
            return Ok(value.trim().to_string());
        }
    }
}

fn ask_services(theme: &ColorfulTheme, config: &mut Config, gpu: bool) -> Result<()> {
    let previous: BTreeSet<ServiceKind> = config
        .services
        .disabled
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect();

    let mut disabled = Vec::new();
    for service in ServiceKind::ALL.into_iter().filter(|s| s.is_optional()) {
        let enable = Confirm::with_theme(theme)
            .with_prompt(format!("Enable {}?", service.label()))
            .default(!previous.contains(&service))
            .interact()?;
        if !enable {
            disabled.push(service.id().to_string());
        }
    }

    let runner_enabled = !disabled.iter().any(|d| d == ServiceKind::ModelRunner.id());
    config.services.force_cpu_model_runner = if !runner_enabled {
        false
    } else if gpu {
        Confirm::with_theme(theme)
            .with_prompt("Run the model runner on the CPU anyway?")
            .default(config.services.force_cpu_model_runner)
            .interact()?
    } else {
        output::note("No GPU detected. The model runner is skipped unless it runs on the CPU.");
        Confirm::with_theme(theme)
            .with_prompt("Run the model runner on the CPU?")
            .default(config.services.force_cpu_model_runner)
            .interact()?
    };
    config.services.disabled = disabled;
    Ok(())
}

/// Ask for the routing answers. `None` when the user declines a warning and
/// wants to choose again.
fn ask_routing(
    theme: &ColorfulTheme,
    previous: &RoutingSection,
    enabled: &[ServiceKind],
) -> Result<Option<RoutingSection>> {
    let labels = [
        "Subdomains (n8n.example.com, langflow.example.com, ...)",
        "Paths on one domain (example.com/n8n, example.com/langflow, ...)",
        "Ports on this host, no proxy or TLS",
    ];
    let current = RoutingMode::ALL
        .iter()
        .position(|m| *m == previous.mode)
        .unwrap_or(0);
    let choice = Select::with_theme(theme)
        .with_prompt("How should the services be reached?")
        .items(&labels)
        .default(current)
        .interact()?;
    let mode = RoutingMode::ALL[choice];

    let mut section = RoutingSection {
        mode,
        ca: previous.ca,
        ..RoutingSection::default()
    };
    let validator = InputValidator::new(mode);
    let backends: Vec<ServiceKind> = enabled
        .iter()
        .copied()
        .filter(|s| *s != ServiceKind::Proxy)
        .collect();

    match mode {
        RoutingMode::Subdomain => {
            let domain = prompt_field(
                theme,
                "Base domain",
                previous.domain.clone(),
                &validator,
                FieldKind::Hostname,
            )?;
            for service in &backends {
                let default = previous
                    .hosts
                    .get(service.id())
                    .cloned()
                    .unwrap_or_else(|| format!("{}.{domain}", service.default_subdomain()));
                let host = prompt_field(
                    theme,
                    &format!("Hostname for {}", service.label()),
                    Some(default),
                    &validator,
                    FieldKind::Hostname,
                )?;
                section.hosts.insert(service.id().to_string(), host);
            }
            section.domain = Some(domain);
        }
        RoutingMode::Path => {
            let domain = prompt_field(
                theme,
                "Domain",
                previous.domain.clone(),
                &validator,
                FieldKind::Hostname,
            )?;
            for service in &backends {
                if !service.supports_path_prefix() {
                    output::warning(&format!(
                        "{} may not work under a path prefix",
                        service.label()
                    ));
                    let prompt = format!("Route {} under a path anyway?", service.label());
                    if !confirm(theme, &prompt, false)? {
                        return Ok(None);
                    }
                }
                let default = previous
                    .paths
                    .get(service.id())
                    .cloned()
                    .unwrap_or_else(|| service.default_path_prefix().to_string());
                let prefix = prompt_field(
                    theme,
                    &format!("Path for {}", service.label()),
                    Some(default),
                    &validator,
                    FieldKind::PathPrefix,
                )?;
                section.paths.insert(service.id().to_string(), prefix);
            }
            section.domain = Some(domain);
        }
        RoutingMode::Port => {
            let mut taken: Vec<u16> = Vec::new();
            for service in &backends {
                let scoped = InputValidator::new(mode).with_taken_ports(taken.iter().copied());
                let default = previous
                    .ports
                    .get(service.id())
                    .copied()
                    .unwrap_or_else(|| i64::from(service.upstream_port()));
                let port = prompt_field(
                    theme,
                    &format!("Host port for {}", service.label()),
                    Some(default.to_string()),
                    &scoped,
                    FieldKind::Port,
                )?;
                let port: u16 = port.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "port",
                    reason: format!("{port} is not a port"),
                })?;
                taken.push(port);
                section.ports.insert(service.id().to_string(), i64::from(port));
            }
        }
    }

    if mode.uses_proxy() {
        output::section("Certificates");
        let email = prompt_field(
            theme,
            "Email for certificate notices",
            previous.acme_email.clone(),
            &validator,
            FieldKind::Email,
        )?;
        section.acme_email = Some(email);

        let authorities: Vec<&str> = CertificateAuthority::ALL.iter().map(|ca| ca.as_str()).collect();
        let current = CertificateAuthority::ALL
            .iter()
            .position(|ca| *ca == previous.ca)
            .unwrap_or(0);
        let choice = Select::with_theme(theme)
            .with_prompt("Certificate authority")
            .items(&authorities)
            .default(current)
            .interact()?;
        section.ca = CertificateAuthority::ALL[choice];
    }

    Ok(Some(section))
}

fn save_answers(path: &Path, config: &Config) -> Result<()> {
    let spinner = output::spinner("Saving answers...");
    match write_atomic(path, &config.to_toml()?) {
        Ok(()) => {
            output::spinner_success(&spinner, &format!("Answers saved to {}", path.display()));
            Ok(())
        }
        Err(e) => {
            output::spinner_fail(&spinner, "Could not save answers");
            Err(e)
        }
    }
}

/// Run the install wizard.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    if output::is_json() {
        return Err(ConfigError::InvalidValue {
            field: "json",
            reason: "`stackforge install` is interactive; use `stackforge render --config <file>` for scripted installs"
                .to_string(),
        }
        .into());
    }

    let answers_path = args.stack.config.config.clone();
    let mut config = stack::load_or_default(&answers_path)?;
    let dir = args
        .stack
        .dir
        .clone()
        .or_else(|| config.install_dir.clone())
        .unwrap_or_else(paths::default_install_dir);

    output::header(env!("CARGO_PKG_VERSION"));
    output::note("Let's set up your stack.");

    let theme = ColorfulTheme::default();

    if dir.join(MANIFEST_FILE).is_file() {
        output::warning(&format!("A stack already exists in {}", dir.display()));
        if !confirm(&theme, "Regenerate its configuration? Credentials are kept.", false)? {
            output::note("Install cancelled.");
            return Ok(());
        }
    }

    let store = FsArtifactStore::new(&dir);
    let probe = HostProbe::new(&dir);
    let pipeline = InstallPipeline::new(&probe, &store, config.policy()?);

    // ─────────────────────────────────────────────────────────────────────────
    // Hardware
    // ─────────────────────────────────────────────────────────────────────────

    output::section("Hardware");
    let spinner = output::spinner("Inspecting host...");
    let facts = pipeline.detect(&config.hardware());
    output::spinner_success(&spinner, "Host inspected");
    detect::show(&facts);

    // ─────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────

    output::section("Services");
    ask_services(&theme, &mut config, facts.gpu().present)?;

    let assessment = pipeline.assess(facts, &config.overrides()?);
    output::section("Resource plan");
    plan::show(&assessment);
    if !assessment.is_feasible() {
        return Err(Error::PlanInfeasible(assessment.issues));
    }
    if !assessment.issues.is_empty() && !confirm(&theme, "Continue despite these warnings?", false)? {
        output::note("Install cancelled.");
        return Ok(());
    }
    let enabled: Vec<ServiceKind> = assessment.plan.enabled_services().collect();

    // ─────────────────────────────────────────────────────────────────────────
    // Routing
    // ─────────────────────────────────────────────────────────────────────────

    let (request, prepared): (_, PreparedInstall) = loop {
        output::section("Routing");
        let Some(section) = ask_routing(&theme, &config.routing, &enabled)? else {
            output::note("Let's go over the routing answers again.");
            continue;
        };
        config.routing = section;
        let attempt = config
            .request()
            .and_then(|request| pipeline.prepare(&request).map(|prepared| (request, prepared)));
        match attempt {
            Ok(done) => break done,
            Err(Error::InputInvalid(issues)) if has_errors(&issues) => {
                output::issues(&issues);
                output::note("Let's go over the routing answers again.");
            }
            Err(e) => return Err(e),
        }
    };

    // Routing can change the plan: port mode drops the proxy and hands its
    // share to the other services.
    output::section("Final plan");
    plan::show(&prepared.assessment);
    if !confirm(&theme, "Write the stack with this plan?", true)? {
        output::note("Install cancelled.");
        return Ok(());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write
    // ─────────────────────────────────────────────────────────────────────────

    output::section("Write");
    config.install_dir = Some(dir.clone());
    save_answers(&answers_path, &config)?;

    let spinner = output::spinner(&format!("Writing stack to {}...", dir.display()));
    let outcome = match pipeline.commit(prepared) {
        Ok(outcome) => outcome,
        Err(e) => {
            output::spinner_fail(&spinner, "Write failed");
            return Err(e);
        }
    };
    output::spinner_success(&spinner, &format!("Stack written to {}", dir.display()));
    summarize("install", &outcome, &request.routing, &dir);

    if args.start {
        output::section("Start");
        let gateway = stack::gateway(&dir).await?;
        gateway.up().await?;
        output::success("Stack started");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ready
    // ─────────────────────────────────────────────────────────────────────────

    output::section("Ready");
    if !args.start {
        output::note(&format!(
            "Start the stack:   {}",
            output::highlight(format!("stackforge up --dir {}", dir.display()))
        ));
    }
    output::note(&format!(
        "Check containers:  {}",
        output::highlight(format!("stackforge status --dir {}", dir.display()))
    ));
    output::note(&format!(
        "Replay this setup: {}",
        output::highlight(format!("stackforge render --config {}", answers_path.display()))
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_port_waits_for_confirmation() {
        let validator = InputValidator::new(RoutingMode::Port);
        let warning = pending_warning(&validator, FieldKind::Port, "999").unwrap();
        assert!(warning.contains("privileged"));
        assert!(pending_warning(&validator, FieldKind::Port, "8000").is_none());
    }

    #[test]
    fn errors_are_not_offered_for_confirmation() {
        let validator = InputValidator::new(RoutingMode::Port);
        assert!(pending_warning(&validator, FieldKind::Port, "443").is_none());
    }
}
