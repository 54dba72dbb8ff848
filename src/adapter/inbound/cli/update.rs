//! `stackforge update` and `stackforge versions`.

use std::io::IsTerminal;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect};
use serde_json::json;
use tabled::{Table, Tabled};

use super::command::{UpdateArgs, VersionsArgs};
use super::{output, stack};
use crate::adapter::outbound::artifact_store::FsArtifactStore;
use crate::adapter::outbound::registry::DockerHubRegistry;
use crate::application::update::{is_stable_tag, UpdateService, VersionCandidate};
use crate::error::Result;
use crate::port::outbound::registry::ImageRegistry;

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Image")]
    image: &'static str,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Latest")]
    latest: String,
}

impl From<&VersionCandidate> for CandidateRow {
    fn from(candidate: &VersionCandidate) -> Self {
        let latest = match &candidate.latest {
            Some(tag) if candidate.has_update() => output::positive(tag),
            Some(tag) => tag.clone(),
            None => "-".into(),
        };
        Self {
            service: candidate.service.to_string(),
            image: candidate.image,
            current: candidate.current.clone(),
            latest,
        }
    }
}

fn interactive() -> bool {
    !output::is_json() && std::io::stdin().is_terminal()
}

/// Run the registry check, offering a retry on network failures.
async fn check_with_retry(service: &UpdateService<'_>) -> Result<Vec<VersionCandidate>> {
    let theme = ColorfulTheme::default();
    loop {
        let spinner = output::spinner("Checking registry for newer tags");
        match service.check().await {
            Ok(candidates) => {
                output::spinner_success(&spinner, "Registry checked");
                return Ok(candidates);
            }
            Err(e) if e.is_retryable() && interactive() => {
                output::spinner_fail(&spinner, &e.to_string());
                let retry = Confirm::with_theme(&theme)
                    .with_prompt("Retry the check?")
                    .default(true)
                    .interact()?;
                if !retry {
                    return Err(e);
                }
            }
            Err(e) => {
                output::spinner_fail(&spinner, "Registry check failed");
                return Err(e);
            }
        }
    }
}

pub async fn execute(args: &UpdateArgs) -> Result<()> {
    let dir = stack::existing_install(&args.stack)?;
    let gateway = stack::gateway(&dir).await?;
    let store = FsArtifactStore::new(&dir);
    let registry = DockerHubRegistry::new();
    let service = UpdateService::new(&gateway, &registry, &store);

    if !output::is_json() {
        output::header(env!("CARGO_PKG_VERSION"));
    }
    let candidates = check_with_retry(&service).await?;
    let available: Vec<VersionCandidate> =
        candidates.iter().filter(|c| c.has_update()).cloned().collect();

    if output::is_json() && (args.check || available.is_empty()) {
        output::json_output(json!({
            "command": "update",
            "candidates": candidates,
            "available": available.len(),
        }));
        return Ok(());
    }

    output::section("Images");
    let rows: Vec<CandidateRow> = candidates.iter().map(CandidateRow::from).collect();
    output::lines(&Table::new(rows).to_string());

    if available.is_empty() {
        output::success("Everything is up to date");
        return Ok(());
    }
    if args.check {
        output::note(&format!("{} update(s) available", available.len()));
        return Ok(());
    }

    let selected: Vec<VersionCandidate> = if args.yes || !interactive() {
        available
    } else {
        let labels: Vec<String> = available
            .iter()
            .map(|c| {
                format!(
                    "{}  {} -> {}",
                    c.service,
                    c.current,
                    c.latest.as_deref().unwrap_or("-")
                )
            })
            .collect();
        let defaults = vec![true; labels.len()];
        let picked = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Select images to update")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;
        picked.into_iter().map(|i| available[i].clone()).collect()
    };

    if selected.is_empty() {
        output::note("Nothing selected");
        return Ok(());
    }

    output::action("Updating", &format!("{} image(s)", selected.len()));
    let backup = service.apply(&selected).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "update",
            "candidates": candidates,
            "applied": selected,
            "backup": backup.display().to_string(),
        }));
        return Ok(());
    }
    output::success(&format!("Updated {} image(s)", selected.len()));
    output::field("Backup", backup.display());
    Ok(())
}

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Stable")]
    stable: &'static str,
}

pub async fn versions(args: &VersionsArgs) -> Result<()> {
    let image = args.service.image();
    let registry = DockerHubRegistry::new();
    let spinner = output::spinner(&format!("Fetching tags for {image}"));
    let tags = match registry.list_available_versions(image).await {
        Ok(tags) => {
            output::spinner_success(&spinner, &format!("{} tags for {image}", tags.len()));
            tags
        }
        Err(e) => {
            output::spinner_fail(&spinner, "Tag lookup failed");
            return Err(e);
        }
    };
    let shown: Vec<&String> = tags.iter().take(args.limit).collect();

    if output::is_json() {
        output::json_output(json!({
            "command": "versions",
            "service": args.service,
            "image": image,
            "tags": shown,
        }));
        return Ok(());
    }

    let rows: Vec<TagRow> = shown
        .iter()
        .map(|tag| TagRow {
            tag: (*tag).clone(),
            stable: if is_stable_tag(tag) { "yes" } else { "no" },
        })
        .collect();
    output::lines(&Table::new(rows).to_string());
    output::field("Default", args.service.default_tag());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::ServiceKind;

    #[test]
    fn rows_mark_missing_latest() {
        let row = CandidateRow::from(&VersionCandidate {
            service: ServiceKind::ModelRunner,
            image: "ollama/ollama",
            current: "0.3.0".into(),
            latest: None,
        });
        assert_eq!(row.service, "model-runner");
        assert_eq!(row.latest, "-");
    }
}
