//! Resource budgeting: hardware facts in, resource plan out.
//!
//! Every enabled service starts at its baseline. Memory above the baselines,
//! up to the safety margin, is split by weight with floor division and each
//! share is capped at the service ceiling. Whatever the caps leave over stays
//! unallocated. If the baselines alone do not fit, limits are scaled down
//! proportionally and the plan records the shortfall for the checker.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::domain::hardware::{GpuVendor, HardwareFacts};
use crate::domain::plan::{ExecutionMode, ResourcePlan, ServiceAllocation};
use crate::domain::policy::PolicyTable;
use crate::domain::service::ServiceKind;

/// User adjustments applied on top of the policy table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetOverrides {
    /// Run the model runner on the CPU. Enables it on hosts without a GPU.
    pub force_cpu_model_runner: bool,
    /// Optional services the user switched off.
    pub disabled: BTreeSet<ServiceKind>,
    /// Per-service memory ceilings; values below the baseline are raised to it.
    pub memory_ceilings: BTreeMap<ServiceKind, u64>,
    /// Leave the proxy out of the plan (port routing).
    pub without_proxy: bool,
}

impl BudgetOverrides {
    fn wants(&self, service: ServiceKind) -> bool {
        if service == ServiceKind::Proxy {
            return !self.without_proxy;
        }
        !(service.is_optional() && self.disabled.contains(&service))
    }
}

/// Turns hardware facts into a [`ResourcePlan`].
#[derive(Debug, Clone, Default)]
pub struct ResourceBudgeter {
    policy: PolicyTable,
}

impl ResourceBudgeter {
    #[must_use]
    pub fn new(policy: PolicyTable) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Build the plan. Pure and deterministic.
    #[must_use]
    pub fn plan(&self, facts: &HardwareFacts, overrides: &BudgetOverrides) -> ResourcePlan {
        let mode = execution_mode(facts, overrides);
        let cpu_only = mode == ExecutionMode::CpuOnly;

        let enabled: Vec<ServiceKind> = ServiceKind::ALL
            .into_iter()
            .filter(|&service| overrides.wants(service))
            .filter(|&service| {
                service != ServiceKind::ModelRunner
                    || facts.gpu().present
                    || overrides.force_cpu_model_runner
            })
            .collect();

        let budget = self.policy.budget_mb(facts.total_memory_mb());
        let baseline_sum: u64 = enabled
            .iter()
            .map(|&s| self.policy.get(s).baseline_mb)
            .sum();

        let (memory, shortfall) = if baseline_sum > budget {
            (self.scale_down(&enabled, baseline_sum, budget), baseline_sum - budget)
        } else {
            (
                self.distribute(&enabled, budget - baseline_sum, cpu_only, overrides),
                0,
            )
        };

        let cpu = self.cpu_shares(&enabled, facts.cpu_cores());

        let allocations = enabled
            .iter()
            .map(|&service| {
                let allocation = ServiceAllocation {
                    memory_limit_mb: memory.get(&service).copied().unwrap_or(0),
                    cpu_share: cpu.get(&service).copied().unwrap_or(0.0),
                    enabled: true,
                };
                (service, allocation)
            })
            .collect();

        debug!(
            budget_mb = budget,
            baseline_mb = baseline_sum,
            shortfall_mb = shortfall,
            model_runner = %mode,
            "Resource plan computed"
        );

        ResourcePlan::new(
            allocations,
            mode,
            overrides.force_cpu_model_runner,
            budget,
            shortfall,
        )
    }

    fn scale_down(
        &self,
        enabled: &[ServiceKind],
        baseline_sum: u64,
        budget: u64,
    ) -> BTreeMap<ServiceKind, u64> {
        enabled
            .iter()
            .map(|&service| {
                let baseline = self.policy.get(service).baseline_mb;
                let scaled = (u128::from(baseline) * u128::from(budget) / u128::from(baseline_sum))
                    as u64;
                (service, scaled)
            })
            .collect()
    }

    fn distribute(
        &self,
        enabled: &[ServiceKind],
        surplus: u64,
        cpu_only: bool,
        overrides: &BudgetOverrides,
    ) -> BTreeMap<ServiceKind, u64> {
        let total_weight: u64 = enabled
            .iter()
            .map(|&s| u64::from(self.policy.get(s).weight))
            .sum();

        enabled
            .iter()
            .map(|&service| {
                let policy = self.policy.get(service);
                let share = if total_weight == 0 {
                    0
                } else {
                    (u128::from(surplus) * u128::from(policy.weight) / u128::from(total_weight))
                        as u64
                };
                let mut ceiling = self.policy.ceiling_mb(service, cpu_only);
                if let Some(&custom) = overrides.memory_ceilings.get(&service) {
                    ceiling = custom.max(policy.baseline_mb);
                }
                let limit = (policy.baseline_mb + share).min(ceiling);
                (service, limit)
            })
            .collect()
    }

    fn cpu_shares(&self, enabled: &[ServiceKind], cores: u32) -> BTreeMap<ServiceKind, f64> {
        let cores = f64::from(cores);
        let total_weight: f64 = enabled
            .iter()
            .map(|&s| f64::from(self.policy.get(s).weight))
            .sum();

        enabled
            .iter()
            .map(|&service| {
                let policy = self.policy.get(service);
                let raw = if total_weight > 0.0 {
                    cores * f64::from(policy.weight) / total_weight
                } else {
                    0.0
                };
                let clamped = raw.max(policy.min_cores).min(cores);
                (service, floor_hundredths(clamped))
            })
            .collect()
    }
}

fn execution_mode(facts: &HardwareFacts, overrides: &BudgetOverrides) -> ExecutionMode {
    let gpu = facts.gpu();
    if !gpu.present || overrides.force_cpu_model_runner {
        return ExecutionMode::CpuOnly;
    }
    match gpu.vendor {
        GpuVendor::Nvidia => ExecutionMode::GpuNvidia,
        GpuVendor::Other => ExecutionMode::GpuGeneric,
        GpuVendor::None => ExecutionMode::CpuOnly,
    }
}

// The epsilon keeps 0.29 from flooring to 0.28 through representation error.
fn floor_hundredths(value: f64) -> f64 {
    ((value * 100.0) + 1e-9).floor() / 100.0
}
