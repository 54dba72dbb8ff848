//! `stackforge render`: replay an answers file without prompting.

use std::path::{Path, PathBuf};

use serde_json::json;

use super::command::RenderArgs;
use super::{output, paths, stack};
use crate::adapter::outbound::artifact_store::FsArtifactStore;
use crate::adapter::outbound::host::HostProbe;
use crate::application::pipeline::{InstallOutcome, InstallPipeline};
use crate::domain::routing::RoutingConfig;
use crate::error::{Error, Result};

fn display_all(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

/// Print what a completed run wrote and where each service answers.
pub fn summarize(command: &str, outcome: &InstallOutcome, routing: &RoutingConfig, dir: &Path) {
    let plan = &outcome.prepared.assessment.plan;
    let endpoints: Vec<(String, String)> = plan
        .enabled_services()
        .filter_map(|s| routing.endpoint(s).map(|url| (s.to_string(), url)))
        .collect();

    if output::is_json() {
        output::json_output(json!({
            "command": command,
            "dir": dir.display().to_string(),
            "written": display_all(&outcome.report.written),
            "removed": display_all(&outcome.report.removed),
            "warnings": outcome.prepared.warnings,
            "endpoints": endpoints
                .iter()
                .map(|(service, url)| json!({ "service": service, "url": url }))
                .collect::<Vec<_>>(),
        }));
        return;
    }

    output::issues(&outcome.prepared.warnings);
    output::section("Files");
    for path in &outcome.report.written {
        output::action_done("Wrote", &path.display().to_string());
    }
    for path in &outcome.report.removed {
        output::action_done("Removed", &path.display().to_string());
    }
    if !endpoints.is_empty() {
        output::section("Endpoints");
        for (service, url) in &endpoints {
            output::field(service, output::highlight(url));
        }
    }
}

pub fn execute(args: &RenderArgs) -> Result<()> {
    let config = stack::read_config(&args.stack.config.config)?;
    let dir = args
        .stack
        .dir
        .clone()
        .or_else(|| config.install_dir.clone())
        .unwrap_or_else(paths::default_install_dir);
    let request = config.request()?;

    let store = FsArtifactStore::new(&dir);
    let probe = HostProbe::new(&dir);
    let pipeline = InstallPipeline::new(&probe, &store, config.policy()?);

    if !output::is_json() {
        output::header(env!("CARGO_PKG_VERSION"));
    }
    let spinner = output::spinner(&format!("Rendering into {}", dir.display()));
    let prepared = match pipeline.prepare(&request) {
        Ok(prepared) => prepared,
        Err(e) => {
            output::spinner_fail(&spinner, "Render failed");
            return Err(e);
        }
    };
    if !prepared.warnings.is_empty() && !args.yes {
        output::spinner_fail(&spinner, "Nothing written");
        if !output::is_json() {
            output::issues(&prepared.warnings);
        }
        return Err(Error::WarningsUnacknowledged(prepared.warnings));
    }
    let outcome = match pipeline.commit(prepared) {
        Ok(outcome) => outcome,
        Err(e) => {
            output::spinner_fail(&spinner, "Render failed");
            return Err(e);
        }
    };
    output::spinner_success(&spinner, &format!("Rendered into {}", dir.display()));

    summarize("render", &outcome, &request.routing, &dir);
    if !output::is_json() {
        output::section("Next steps");
        output::note(&format!(
            "Start the stack with {}",
            output::highlight(format!("stackforge up --dir {}", dir.display()))
        ));
    }
    Ok(())
}
