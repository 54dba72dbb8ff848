//! Resource plan derived from hardware facts.
//!
//! A [`ResourcePlan`] maps every service to a memory ceiling, a CPU share and
//! an enablement decision. Plans are built once per run and never persisted.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::service::ServiceKind;

/// How the model runner executes inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// NVIDIA GPU reserved through the container runtime's device requests.
    GpuNvidia,
    /// Non-NVIDIA accelerator passed through as `/dev/dri`.
    GpuGeneric,
    /// No accelerator; inference runs on the CPU.
    CpuOnly,
}

impl ExecutionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GpuNvidia => "gpu-nvidia",
            Self::GpuGeneric => "gpu-generic",
            Self::CpuOnly => "cpu-only",
        }
    }

    #[must_use]
    pub const fn uses_gpu(self) -> bool {
        !matches!(self, Self::CpuOnly)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocation for a single service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServiceAllocation {
    pub memory_limit_mb: u64,
    /// Fractional cores, floored to two decimals.
    pub cpu_share: f64,
    pub enabled: bool,
}

impl ServiceAllocation {
    /// A disabled allocation with no resources.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            memory_limit_mb: 0,
            cpu_share: 0.0,
            enabled: false,
        }
    }
}

/// Per-service resource plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePlan {
    allocations: BTreeMap<ServiceKind, ServiceAllocation>,
    model_runner_mode: ExecutionMode,
    cpu_override: bool,
    budget_mb: u64,
    shortfall_mb: u64,
}

impl ResourcePlan {
    /// Assemble a plan. Services missing from `allocations` are disabled.
    #[must_use]
    pub fn new(
        mut allocations: BTreeMap<ServiceKind, ServiceAllocation>,
        model_runner_mode: ExecutionMode,
        cpu_override: bool,
        budget_mb: u64,
        shortfall_mb: u64,
    ) -> Self {
        for service in ServiceKind::ALL {
            allocations
                .entry(service)
                .or_insert_with(ServiceAllocation::disabled);
        }
        Self {
            allocations,
            model_runner_mode,
            cpu_override,
            budget_mb,
            shortfall_mb,
        }
    }

    /// Allocation for `service`.
    #[must_use]
    pub fn allocation(&self, service: ServiceKind) -> ServiceAllocation {
        self.allocations
            .get(&service)
            .copied()
            .unwrap_or_else(ServiceAllocation::disabled)
    }

    #[must_use]
    pub fn is_enabled(&self, service: ServiceKind) -> bool {
        self.allocation(service).enabled
    }

    /// Enabled services in manifest order.
    pub fn enabled_services(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        self.allocations
            .iter()
            .filter(|(_, a)| a.enabled)
            .map(|(service, _)| *service)
    }

    /// All allocations in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = (ServiceKind, ServiceAllocation)> + '_ {
        self.allocations.iter().map(|(s, a)| (*s, *a))
    }

    /// Sum of enabled memory limits.
    #[must_use]
    pub fn total_memory_mb(&self) -> u64 {
        self.allocations
            .values()
            .filter(|a| a.enabled)
            .map(|a| a.memory_limit_mb)
            .sum()
    }

    #[must_use]
    pub const fn model_runner_mode(&self) -> ExecutionMode {
        self.model_runner_mode
    }

    /// Whether the user explicitly asked for a CPU-only model runner.
    #[must_use]
    pub const fn cpu_override(&self) -> bool {
        self.cpu_override
    }

    /// Memory available to the stack after the safety margin.
    #[must_use]
    pub const fn budget_mb(&self) -> u64 {
        self.budget_mb
    }

    /// How far enabled baselines exceed the budget; zero when they fit.
    #[must_use]
    pub const fn shortfall_mb(&self) -> u64 {
        self.shortfall_mb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(memory: u64, enabled: bool) -> ServiceAllocation {
        ServiceAllocation {
            memory_limit_mb: memory,
            cpu_share: 0.5,
            enabled,
        }
    }

    #[test]
    fn missing_services_are_disabled() {
        let mut allocations = BTreeMap::new();
        allocations.insert(ServiceKind::Database, allocation(1024, true));
        let plan = ResourcePlan::new(allocations, ExecutionMode::CpuOnly, false, 4096, 0);

        assert!(plan.is_enabled(ServiceKind::Database));
        assert!(!plan.is_enabled(ServiceKind::ModelRunner));
        assert_eq!(plan.iter().count(), ServiceKind::ALL.len());
    }

    #[test]
    fn total_memory_counts_enabled_only() {
        let mut allocations = BTreeMap::new();
        allocations.insert(ServiceKind::Database, allocation(1024, true));
        allocations.insert(ServiceKind::Proxy, allocation(128, true));
        allocations.insert(ServiceKind::ModelRunner, allocation(4096, false));
        let plan = ResourcePlan::new(allocations, ExecutionMode::CpuOnly, false, 8192, 0);

        assert_eq!(plan.total_memory_mb(), 1152);
        assert_eq!(
            plan.enabled_services().collect::<Vec<_>>(),
            vec![ServiceKind::Database, ServiceKind::Proxy]
        );
    }
}
