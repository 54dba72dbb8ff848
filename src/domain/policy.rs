//! Resource policy: baselines, ceilings and surplus weights per service.
//!
//! The numbers are policy, not physics. [`PolicyTable::default`] holds the
//! shipped values and the `[policy]` config table can override any of them.

use std::collections::BTreeMap;

use serde::Serialize;

use super::service::ServiceKind;

/// Policy for one service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServicePolicy {
    /// Minimum memory the service is assumed to need.
    pub baseline_mb: u64,
    /// Minimum fractional cores.
    pub min_cores: f64,
    /// Upper bound on the memory limit.
    pub ceiling_mb: u64,
    /// Relative claim on surplus memory and on CPU.
    pub weight: u32,
}

/// Full policy table consumed by the budgeter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyTable {
    services: BTreeMap<ServiceKind, ServicePolicy>,
    /// Reduced ceiling for a model runner without an accelerator.
    pub model_runner_cpu_ceiling_mb: u64,
    /// Fraction of total memory the stack may use.
    pub safety_margin: f64,
}

impl PolicyTable {
    #[must_use]
    pub fn get(&self, service: ServiceKind) -> ServicePolicy {
        self.services
            .get(&service)
            .copied()
            .unwrap_or_else(|| default_policy(service))
    }

    pub fn set(&mut self, service: ServiceKind, policy: ServicePolicy) {
        self.services.insert(service, policy);
    }

    /// Memory ceiling, accounting for CPU-only execution of the model runner.
    #[must_use]
    pub fn ceiling_mb(&self, service: ServiceKind, cpu_only: bool) -> u64 {
        let policy = self.get(service);
        if service == ServiceKind::ModelRunner && cpu_only {
            self.model_runner_cpu_ceiling_mb.max(policy.baseline_mb)
        } else {
            policy.ceiling_mb.max(policy.baseline_mb)
        }
    }

    /// Memory usable by the stack on a host with `total_mb`.
    #[must_use]
    pub fn budget_mb(&self, total_mb: u64) -> u64 {
        (total_mb as f64 * self.safety_margin).floor() as u64
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            services: ServiceKind::ALL
                .into_iter()
                .map(|service| (service, default_policy(service)))
                .collect(),
            model_runner_cpu_ceiling_mb: 4096,
            safety_margin: 0.8,
        }
    }
}

fn default_policy(service: ServiceKind) -> ServicePolicy {
    let (baseline_mb, min_cores, ceiling_mb, weight) = match service {
        ServiceKind::WorkflowEngine => (512, 0.25, 4096, 2),
        ServiceKind::FlowBuilder => (1024, 0.5, 8192, 4),
        ServiceKind::Database => (1024, 0.25, 2048, 3),
        ServiceKind::ModelRunner => (2048, 1.0, 8192, 4),
        ServiceKind::Proxy => (128, 0.1, 256, 1),
    };
    ServicePolicy {
        baseline_mb,
        min_cores,
        ceiling_mb,
        weight,
    }
}
