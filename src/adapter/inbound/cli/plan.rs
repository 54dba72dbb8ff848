//! `stackforge plan`: show how memory and CPU would be split on this host.

use serde_json::json;
use tabled::{Table, Tabled};

use super::command::PlanArgs;
use super::detect::{self, format_mb};
use super::{output, stack};
use crate::adapter::outbound::host::HostProbe;
use crate::application::budget::ResourceBudgeter;
use crate::application::checker::ResourceChecker;
use crate::application::pipeline::Assessment;
use crate::domain::issue::has_errors;
use crate::domain::service::ServiceKind;
use crate::error::{ConfigError, Error, Result};
use crate::port::outbound::probe::HardwareProbe;

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Service")]
    service: &'static str,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

fn rows(assessment: &Assessment) -> Vec<PlanRow> {
    let plan = &assessment.plan;
    plan.iter()
        .map(|(service, allocation)| {
            let notes = if service == ServiceKind::ModelRunner && allocation.enabled {
                plan.model_runner_mode().to_string()
            } else {
                String::new()
            };
            PlanRow {
                service: service.label(),
                enabled: if allocation.enabled { "yes" } else { "no" },
                memory: if allocation.enabled {
                    format_mb(allocation.memory_limit_mb)
                } else {
                    "-".into()
                },
                cpu: if allocation.enabled {
                    format!("{:.2}", allocation.cpu_share)
                } else {
                    "-".into()
                },
                notes,
            }
        })
        .collect()
}

/// Print the plan table, totals and findings.
pub fn show(assessment: &Assessment) {
    let plan = &assessment.plan;
    output::lines(&Table::new(rows(assessment)).to_string());
    output::field("Budget", format_mb(plan.budget_mb()));
    output::field("Allocated", format_mb(plan.total_memory_mb()));
    if plan.shortfall_mb() > 0 {
        output::field("Shortfall", output::negative(format_mb(plan.shortfall_mb())));
    }
    output::issues(&assessment.issues);
}

/// JSON form of an assessment.
#[must_use]
pub fn to_json(assessment: &Assessment) -> serde_json::Value {
    json!({
        "hardware": assessment.facts,
        "plan": assessment.plan,
        "issues": assessment.issues,
        "feasible": assessment.is_feasible(),
    })
}

pub fn execute(args: &PlanArgs) -> Result<()> {
    let config = stack::load_or_default(&args.config.config)?;
    let mut overrides = config.overrides()?;
    overrides.force_cpu_model_runner |= args.force_cpu;
    for service in &args.disabled {
        if !service.is_optional() {
            return Err(ConfigError::InvalidValue {
                field: "disable",
                reason: format!("{service} is required and cannot be disabled"),
            }
            .into());
        }
        overrides.disabled.insert(*service);
    }

    let policy = config.policy()?;
    let facts = config.hardware().apply(HostProbe::default().detect());
    let plan = ResourceBudgeter::new(policy.clone()).plan(&facts, &overrides);
    let issues = ResourceChecker::new(policy).check(&plan, &facts);
    let assessment = Assessment {
        facts,
        plan,
        issues,
    };

    if output::is_json() {
        let mut value = to_json(&assessment);
        value["command"] = json!("plan");
        output::json_output(value);
    } else {
        output::header(env!("CARGO_PKG_VERSION"));
        output::section("Hardware");
        detect::show(&assessment.facts);
        output::section("Resource plan");
        show(&assessment);
    }

    if has_errors(&assessment.issues) {
        return Err(Error::PlanInfeasible(assessment.issues));
    }
    Ok(())
}
