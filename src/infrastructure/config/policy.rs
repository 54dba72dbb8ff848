//! `[policy]` table: overrides for the resource policy.
//!
//! Any field left out keeps the shipped value from
//! [`PolicyTable::default`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::policy::{PolicyTable, ServicePolicy};
use crate::domain::service::ServiceKind;
use crate::error::{ConfigError, Result};

/// Partial policy for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicePolicyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cores: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

/// Policy overrides as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Fraction of total memory the stack may claim, in `(0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_runner_cpu_ceiling_mb: Option<u64>,
    /// Keyed by service id or product alias.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServicePolicyConfig>,
}

impl PolicyConfig {
    /// Merge onto the default table and validate the result.
    pub fn to_table(&self) -> Result<PolicyTable> {
        let mut table = PolicyTable::default();

        if let Some(margin) = self.safety_margin {
            if !(margin > 0.0 && margin <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    field: "policy.safety_margin",
                    reason: "must be greater than 0 and at most 1".into(),
                }
                .into());
            }
            table.safety_margin = margin;
        }
        if let Some(ceiling) = self.model_runner_cpu_ceiling_mb {
            table.model_runner_cpu_ceiling_mb = ceiling;
        }

        for (name, overrides) in &self.services {
            let service: ServiceKind = name.parse()?;
            let base = table.get(service);
            let merged = ServicePolicy {
                baseline_mb: overrides.baseline_mb.unwrap_or(base.baseline_mb),
                min_cores: overrides.min_cores.unwrap_or(base.min_cores),
                ceiling_mb: overrides.ceiling_mb.unwrap_or(base.ceiling_mb),
                weight: overrides.weight.unwrap_or(base.weight),
            };
            validate_service(&merged)?;
            table.set(service, merged);
        }

        Ok(table)
    }
}

fn validate_service(policy: &ServicePolicy) -> Result<()> {
    if policy.baseline_mb == 0 {
        return Err(ConfigError::InvalidValue {
            field: "policy.services.baseline_mb",
            reason: "must be greater than 0".into(),
        }
        .into());
    }
    if policy.ceiling_mb < policy.baseline_mb {
        return Err(ConfigError::InvalidValue {
            field: "policy.services.ceiling_mb",
            reason: format!("must be at least the baseline ({} MB)", policy.baseline_mb),
        }
        .into());
    }
    if !(policy.min_cores.is_finite() && policy.min_cores > 0.0) {
        return Err(ConfigError::InvalidValue {
            field: "policy.services.min_cores",
            reason: "must be greater than 0".into(),
        }
        .into());
    }
    if policy.weight == 0 {
        return Err(ConfigError::InvalidValue {
            field: "policy.services.weight",
            reason: "must be greater than 0".into(),
        }
        .into());
    }
    Ok(())
}
