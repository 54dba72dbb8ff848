//! Feasibility checks for a resource plan against the host.
//!
//! Every rule runs on every call so the user sees all problems at once.
//! Rules run in a fixed order, which keeps reports stable between runs.

use crate::domain::hardware::HardwareFacts;
use crate::domain::issue::ValidationIssue;
use crate::domain::plan::ResourcePlan;
use crate::domain::policy::PolicyTable;
use crate::domain::service::ServiceKind;

/// Free disk the database needs for its working set.
pub const DATABASE_DISK_MB: u64 = 5 * 1024;
/// Free disk per optional service.
pub const OPTIONAL_SERVICE_DISK_MB: u64 = 3 * 1024;
/// Free disk for model weights, charged instead of the optional allowance.
pub const MODEL_RUNNER_DISK_MB: u64 = 5 * 1024;
/// Total memory below which the host is considered small.
pub const RECOMMENDED_MEMORY_MB: u64 = 8 * 1024;

/// Validates plans against hardware facts and the policy table.
#[derive(Debug, Clone, Default)]
pub struct ResourceChecker {
    policy: PolicyTable,
}

impl ResourceChecker {
    #[must_use]
    pub fn new(policy: PolicyTable) -> Self {
        Self { policy }
    }

    /// Run every rule and collect the issues.
    #[must_use]
    pub fn check(&self, plan: &ResourcePlan, facts: &HardwareFacts) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let total = facts.total_memory_mb();

        for service in plan.enabled_services() {
            let baseline = self.policy.get(service).baseline_mb;
            if baseline > total {
                issues.push(ValidationIssue::error(
                    format!("memory.{service}"),
                    format!("{service} needs {baseline} MB but the host has {total} MB"),
                ));
            }
        }

        if plan.shortfall_mb() > 0 {
            issues.push(ValidationIssue::error(
                "memory",
                format!(
                    "enabled services need {} MB more than the {} MB budget ({}% of {} MB)",
                    plan.shortfall_mb(),
                    plan.budget_mb(),
                    (self.policy.safety_margin * 100.0).round(),
                    total
                ),
            ));
        }

        if plan.is_enabled(ServiceKind::ModelRunner)
            && !facts.gpu().present
            && !plan.cpu_override()
        {
            issues.push(ValidationIssue::error(
                "model-runner",
                "model runner is enabled without a GPU and CPU-only mode was not requested",
            ));
        }

        let min_cores: f64 = plan
            .enabled_services()
            .map(|s| self.policy.get(s).min_cores)
            .sum();
        if f64::from(facts.cpu_cores()) < min_cores {
            issues.push(ValidationIssue::warning(
                "cpu",
                format!(
                    "enabled services want {min_cores:.2} cores, the host has {}",
                    facts.cpu_cores()
                ),
            ));
        }

        if !facts.memory_known() {
            issues.push(ValidationIssue::warning(
                "memory",
                format!(
                    "total memory is unknown; planned for {total} MB, set [hardware] memory_mb to use the real amount"
                ),
            ));
        } else if total < RECOMMENDED_MEMORY_MB {
            issues.push(ValidationIssue::warning(
                "memory",
                format!("{total} MB of memory is below the recommended {RECOMMENDED_MEMORY_MB} MB"),
            ));
        }

        self.check_disk(plan, facts, &mut issues);

        issues
    }

    fn check_disk(&self, plan: &ResourcePlan, facts: &HardwareFacts, issues: &mut Vec<ValidationIssue>) {
        let Some(free) = facts.free_disk_mb() else {
            issues.push(ValidationIssue::warning(
                "disk",
                "free disk space is unknown; make sure images and volumes will fit",
            ));
            return;
        };

        if free < DATABASE_DISK_MB {
            issues.push(ValidationIssue::warning(
                "disk.database",
                format!("{free} MB free is below the database working set of {DATABASE_DISK_MB} MB"),
            ));
        }

        let required = disk_requirement_mb(plan);
        if free < required {
            issues.push(ValidationIssue::warning(
                "disk",
                format!("{free} MB free, enabled services need {required} MB"),
            ));
        } else if (free as f64) < required as f64 * 1.5 {
            issues.push(ValidationIssue::warning(
                "disk",
                format!(
                    "{free} MB free leaves little headroom; {} MB recommended",
                    (required as f64 * 1.5).ceil()
                ),
            ));
        }
    }
}

/// Disk needed for the enabled services' images and data.
#[must_use]
pub fn disk_requirement_mb(plan: &ResourcePlan) -> u64 {
    plan.enabled_services()
        .map(|service| match service {
            ServiceKind::Database => DATABASE_DISK_MB,
            ServiceKind::ModelRunner => MODEL_RUNNER_DISK_MB,
            ServiceKind::WorkflowEngine | ServiceKind::FlowBuilder => OPTIONAL_SERVICE_DISK_MB,
            ServiceKind::Proxy => 0,
        })
        .sum()
}
