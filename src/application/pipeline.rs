//! Install pipeline: probe, plan, check, validate, render, write.
//!
//! Each stage consumes the previous stage's value. Nothing is written until
//! every gate has passed, so a failed run leaves earlier artifacts in place.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::domain::artifact::RenderedArtifacts;
use crate::domain::hardware::{GpuVendor, HardwareFacts};
use crate::domain::input::InstallInput;
use crate::domain::issue::{has_errors, ValidationIssue};
use crate::domain::plan::ResourcePlan;
use crate::domain::policy::PolicyTable;
use crate::domain::routing::RoutingConfig;
use crate::domain::service::ServiceKind;
use crate::error::{Error, Result};
use crate::port::outbound::probe::HardwareProbe;
use crate::port::outbound::store::{ArtifactStore, WriteReport};

use super::budget::{BudgetOverrides, ResourceBudgeter};
use super::checker::ResourceChecker;
use super::render::ArtifactRenderer;
use super::secrets::resolve_credentials;
use super::update::pinned_versions;
use super::validator::InputValidator;

/// Replacement values for detected hardware facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareOverrides {
    pub cpu_cores: Option<u32>,
    pub total_memory_mb: Option<u64>,
    pub free_disk_mb: Option<u64>,
    pub gpu: Option<GpuVendor>,
}

impl HardwareOverrides {
    #[must_use]
    pub fn apply(&self, facts: HardwareFacts) -> HardwareFacts {
        facts.with_overrides(
            self.cpu_cores,
            self.total_memory_mb,
            self.free_disk_mb,
            self.gpu,
        )
    }
}

/// Answers for one install run.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub hardware: HardwareOverrides,
    pub overrides: BudgetOverrides,
    pub routing: RoutingConfig,
    pub project_name: String,
    pub timezone: String,
    pub versions: BTreeMap<ServiceKind, String>,
}

/// Plan for a host together with the checker's report.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub facts: HardwareFacts,
    pub plan: ResourcePlan,
    pub issues: Vec<ValidationIssue>,
}

impl Assessment {
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        !has_errors(&self.issues)
    }
}

/// Rendered artifacts that passed every gate but are not yet on disk.
#[derive(Debug)]
pub struct PreparedInstall {
    pub assessment: Assessment,
    /// Warnings from planning and routing validation.
    pub warnings: Vec<ValidationIssue>,
    pub artifacts: RenderedArtifacts,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct InstallOutcome {
    pub prepared: PreparedInstall,
    pub report: WriteReport,
}

/// Wires the pipeline stages to a probe and a store.
pub struct InstallPipeline<'a> {
    probe: &'a dyn HardwareProbe,
    store: &'a dyn ArtifactStore,
    budgeter: ResourceBudgeter,
    checker: ResourceChecker,
    renderer: ArtifactRenderer,
}

impl<'a> InstallPipeline<'a> {
    #[must_use]
    pub fn new(
        probe: &'a dyn HardwareProbe,
        store: &'a dyn ArtifactStore,
        policy: PolicyTable,
    ) -> Self {
        Self {
            probe,
            store,
            budgeter: ResourceBudgeter::new(policy.clone()),
            checker: ResourceChecker::new(policy),
            renderer: ArtifactRenderer::new(),
        }
    }

    /// Probe the host and apply overrides.
    #[must_use]
    pub fn detect(&self, overrides: &HardwareOverrides) -> HardwareFacts {
        overrides.apply(self.probe.detect())
    }

    /// Plan and check without touching the routing answers.
    #[must_use]
    pub fn assess(&self, facts: HardwareFacts, overrides: &BudgetOverrides) -> Assessment {
        let plan = self.budgeter.plan(&facts, overrides);
        let issues = self.checker.check(&plan, &facts);
        Assessment {
            facts,
            plan,
            issues,
        }
    }

    /// Run every gate and render, without writing.
    pub fn prepare(&self, request: &InstallRequest) -> Result<PreparedInstall> {
        let facts = self.detect(&request.hardware);
        let mut overrides = request.overrides.clone();
        overrides.without_proxy |= !request.routing.mode().uses_proxy();

        let assessment = self.assess(facts, &overrides);
        if !assessment.is_feasible() {
            return Err(Error::PlanInfeasible(assessment.issues));
        }

        let enabled: Vec<ServiceKind> = assessment.plan.enabled_services().collect();
        let routing_issues = InputValidator::new(request.routing.mode())
            .validate_routing(&request.routing, &enabled);
        if has_errors(&routing_issues) {
            return Err(Error::InputInvalid(routing_issues));
        }

        // Tags applied by `update` live only in the env file; answers pins win.
        let existing = self.store.read_env()?;
        let mut versions = pinned_versions(&existing);
        versions.extend(request.versions.clone());
        let input = InstallInput {
            project_name: request.project_name.clone(),
            timezone: request.timezone.clone(),
            versions,
            credentials: resolve_credentials(&existing),
        };
        let artifacts = self
            .renderer
            .render(&assessment.plan, &request.routing, &input)?;

        let warnings: Vec<ValidationIssue> = assessment
            .issues
            .iter()
            .chain(routing_issues.iter())
            .cloned()
            .collect();
        for issue in &warnings {
            warn!(field = %issue.field, message = %issue.message, "Install warning");
        }

        Ok(PreparedInstall {
            assessment,
            warnings,
            artifacts,
        })
    }

    /// Write prepared artifacts.
    pub fn commit(&self, prepared: PreparedInstall) -> Result<InstallOutcome> {
        let report = self.store.write(&prepared.artifacts)?;
        info!(
            written = report.written.len(),
            removed = report.removed.len(),
            "Artifacts written"
        );
        Ok(InstallOutcome { prepared, report })
    }

    /// Prepare and write in one step.
    pub fn run(&self, request: &InstallRequest) -> Result<InstallOutcome> {
        let prepared = self.prepare(request)?;
        self.commit(prepared)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::hardware::{GpuInfo, OsFamily};
    use crate::domain::routing::RoutingMode;
    use crate::port::outbound::probe::FixedProbe;

    #[derive(Default)]
    struct MemoryStore {
        env: HashMap<String, String>,
        writes: Mutex<Vec<PathBuf>>,
    }

    impl ArtifactStore for MemoryStore {
        fn write(&self, artifacts: &RenderedArtifacts) -> Result<WriteReport> {
            let written: Vec<PathBuf> = artifacts.files().map(|f| f.path().to_path_buf()).collect();
            if let Ok(mut writes) = self.writes.lock() {
                writes.extend(written.iter().cloned());
            }
            Ok(WriteReport {
                written,
                removed: Vec::new(),
            })
        }

        fn read_env(&self) -> Result<HashMap<String, String>> {
            Ok(self.env.clone())
        }

        fn update_env(&self, _updates: &[(String, String)]) -> Result<()> {
            Ok(())
        }

        fn backup(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("backups/test"))
        }
    }

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

    fn port_routing() -> RoutingConfig {
        let mut routing = RoutingConfig::new(RoutingMode::Port);
        routing.set_port(ServiceKind::WorkflowEngine, 5678);
        routing.set_port(ServiceKind::FlowBuilder, 7860);
        routing.set_port(ServiceKind::Database, 3000);
        routing
    }

    #[test]
    fn infeasible_plan_writes_nothing() {
        let probe = FixedProbe(HardwareFacts::new(
            1,
            1024,
            Some(100_000),
            GpuInfo::absent(),
            OsFamily::Linux,
        ));
        let store = MemoryStore::default();
        let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

        let err = pipeline.run(&request(port_routing())).unwrap_err();
        assert!(matches!(err, Error::PlanInfeasible(_)));
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_routing_is_reported_before_render() {
        let probe = FixedProbe(HardwareFacts::new(
            4,
            16_384,
            Some(100_000),
            GpuInfo::absent(),
            OsFamily::Linux,
        ));
        let store = MemoryStore::default();
        let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

        let mut routing = port_routing();
        routing.set_port(ServiceKind::Database, 443);

        let err = pipeline.run(&request(routing)).unwrap_err();
        let Error::InputInvalid(issues) = err else {
            panic!("expected InputInvalid");
        };
        assert!(issues.iter().any(|i| i.field == "database.port"));
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn hardware_overrides_replace_detected_values() {
        let probe = FixedProbe(HardwareFacts::new(
            2,
            4096,
            None,
            GpuInfo::absent(),
            OsFamily::Linux,
        ));
        let store = MemoryStore::default();
        let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

        let facts = pipeline.detect(&HardwareOverrides {
            total_memory_mb: Some(32_768),
            gpu: Some(GpuVendor::Nvidia),
            ..HardwareOverrides::default()
        });
        assert_eq!(facts.cpu_cores(), 2);
        assert_eq!(facts.total_memory_mb(), 32_768);
        assert!(facts.gpu().present);
    }

    #[test]
    fn port_mode_run_writes_env_and_manifest_only() {
        let probe = FixedProbe(HardwareFacts::new(
            4,
            16_384,
            Some(100_000),
            GpuInfo::absent(),
            OsFamily::Linux,
        ));
        let store = MemoryStore::default();
        let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

        let outcome = pipeline.run(&request(port_routing())).unwrap();
        assert_eq!(outcome.report.written.len(), 2);
        assert!(!outcome
            .prepared
            .assessment
            .plan
            .is_enabled(ServiceKind::Proxy));
    }

    #[test]
    fn prepared_plan_reflects_routing() {
        let probe = FixedProbe(HardwareFacts::new(
            4,
            16_384,
            Some(100_000),
            GpuInfo::absent(),
            OsFamily::Linux,
        ));
        let store = MemoryStore::default();
        let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

        let facts = pipeline.detect(&HardwareOverrides::default());
        let early = pipeline.assess(facts, &BudgetOverrides::default());
        let prepared = pipeline.prepare(&request(port_routing())).unwrap();

        assert!(early.plan.is_enabled(ServiceKind::Proxy));
        assert!(!prepared.assessment.plan.is_enabled(ServiceKind::Proxy));
        let memory = |plan: &ResourcePlan| plan.allocation(ServiceKind::WorkflowEngine).memory_limit_mb;
        assert!(memory(&prepared.assessment.plan) > memory(&early.plan));
    }

    #[test]
    fn env_pinned_tags_are_reused() {
        let probe = FixedProbe(HardwareFacts::new(
            4,
            16_384,
            Some(100_000),
            GpuInfo::absent(),
            OsFamily::Linux,
        ));
        let mut store = MemoryStore::default();
        store
            .env
            .insert("DATABASE_VERSION".into(), "15.9.0.001".into());
        let pipeline = InstallPipeline::new(&probe, &store, PolicyTable::default());

        let prepared = pipeline.prepare(&request(port_routing())).unwrap();
        assert!(prepared
            .artifacts
            .env
            .contents()
            .contains("DATABASE_VERSION=15.9.0.001\n"));
    }
}
