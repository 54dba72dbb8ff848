//! Image update flow.
//!
//! Reads pinned tags from the env file, asks the registry for newer ones,
//! and applies a selection: back up, rewrite `*_VERSION` keys, then
//! `down`, `pull`, `up`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::service::ServiceKind;
use crate::error::Result;
use crate::port::outbound::orchestrator::Orchestrator;
use crate::port::outbound::registry::ImageRegistry;
use crate::port::outbound::store::ArtifactStore;

const PRERELEASE_MARKERS: [&str; 6] = ["rc", "beta", "alpha", "dev", "nightly", "exp"];

/// Update status of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCandidate {
    pub service: ServiceKind,
    pub image: &'static str,
    pub current: String,
    /// Newest stable tag the registry reported.
    pub latest: Option<String>,
}

impl VersionCandidate {
    /// True when the newest tag sorts after the current one.
    #[must_use]
    pub fn has_update(&self) -> bool {
        match &self.latest {
            Some(latest) => compare_versions(latest, &self.current) == Ordering::Greater,
            None => false,
        }
    }
}

/// Compare two tags. `latest` sorts after every numbered tag; otherwise
/// numeric components are compared left to right, missing ones as zero.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a == "latest", b == "latest") {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let left = numeric_parts(a);
    let right = numeric_parts(b);
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn numeric_parts(tag: &str) -> Vec<u64> {
    tag.split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Whether a tag looks like a stable numbered release.
#[must_use]
pub fn is_stable_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    tag.chars().next().is_some_and(|c| c.is_ascii_digit() || c == 'v')
        && tag.chars().any(|c| c.is_ascii_digit())
        && !PRERELEASE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Variant suffix after the version number: `-alpine` in `2.8.4-alpine`.
#[must_use]
pub fn tag_flavor(tag: &str) -> &str {
    let body = tag.strip_prefix('v').unwrap_or(tag);
    let end = body
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(body.len());
    &body[end..]
}

/// Newest stable tag in `tags`.
#[must_use]
pub fn newest_stable(tags: &[String]) -> Option<String> {
    tags.iter()
        .filter(|t| is_stable_tag(t))
        .max_by(|a, b| compare_versions(a, b))
        .cloned()
}

/// Newest stable tag sharing the flavor of `current`. A floating `latest`
/// accepts any flavor.
#[must_use]
pub fn newest_matching(tags: &[String], current: &str) -> Option<String> {
    if current == "latest" {
        return newest_stable(tags);
    }
    let flavor = tag_flavor(current);
    let matching: Vec<String> = tags
        .iter()
        .filter(|t| tag_flavor(t) == flavor)
        .cloned()
        .collect();
    newest_stable(&matching)
}

/// Every non-empty `*_VERSION` value in env values.
#[must_use]
pub fn pinned_versions(env: &HashMap<String, String>) -> BTreeMap<ServiceKind, String> {
    ServiceKind::ALL
        .into_iter()
        .filter_map(|s| {
            env.get(&s.key("VERSION"))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| (s, v.to_string()))
        })
        .collect()
}

/// Pinned tags of the enabled services, read from env values.
#[must_use]
pub fn current_versions(env: &HashMap<String, String>) -> BTreeMap<ServiceKind, String> {
    let mut pinned = pinned_versions(env);
    pinned.retain(|s, _| {
        env.get(&s.key("ENABLED"))
            .map_or(false, |v| v.eq_ignore_ascii_case("true"))
    });
    pinned
}

/// Env updates for the selected candidates.
#[must_use]
pub fn version_updates(selected: &[VersionCandidate]) -> Vec<(String, String)> {
    selected
        .iter()
        .filter_map(|c| {
            c.latest
                .as_ref()
                .map(|latest| (c.service.key("VERSION"), latest.clone()))
        })
        .collect()
}

/// Drives update checks and application through the ports.
pub struct UpdateService<'a> {
    orchestrator: &'a dyn Orchestrator,
    registry: &'a dyn ImageRegistry,
    store: &'a dyn ArtifactStore,
}

impl<'a> UpdateService<'a> {
    #[must_use]
    pub fn new(
        orchestrator: &'a dyn Orchestrator,
        registry: &'a dyn ImageRegistry,
        store: &'a dyn ArtifactStore,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            store,
        }
    }

    /// Query the registry for every enabled service.
    ///
    /// A network failure aborts the whole check so the caller can retry it.
    pub async fn check(&self) -> Result<Vec<VersionCandidate>> {
        let env = self.store.read_env()?;
        let mut candidates = Vec::new();
        for (service, current) in current_versions(&env) {
            let tags = self.registry.list_available_versions(service.image()).await?;
            let latest = newest_matching(&tags, &current);
            info!(
                service = %service,
                current = %current,
                latest = latest.as_deref().unwrap_or("-"),
                "Version checked"
            );
            candidates.push(VersionCandidate {
                service,
                image: service.image(),
                current,
                latest,
            });
        }
        Ok(candidates)
    }

    /// Apply the selected updates. Returns the backup directory.
    pub async fn apply(&self, selected: &[VersionCandidate]) -> Result<PathBuf> {
        let backup = self.store.backup()?;
        info!(backup = %backup.display(), "Artifacts backed up");

        let updates = version_updates(selected);
        self.store.update_env(&updates)?;

        self.orchestrator.down().await?;
        self.orchestrator.pull().await?;
        if let Err(e) = self.orchestrator.up().await {
            warn!(error = %e, backup = %backup.display(), "Stack failed to start after update");
            return Err(e);
        }
        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn compares_numeric_components() {
        assert_eq!(compare_versions("1.64.0", "1.9.2"), Ordering::Greater);
        assert_eq!(compare_versions("15.8.1.060", "15.8.1.100"), Ordering::Less);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("latest", "99.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "latest"), Ordering::Less);
    }

    #[test]
    fn picks_newest_stable_tag() {
        let list = tags(&["latest", "1.65.0-rc.1", "1.64.2", "1.64.10", "nightly", "beta"]);
        assert_eq!(newest_stable(&list), Some("1.64.10".to_string()));
        assert_eq!(newest_stable(&tags(&["latest"])), None);
    }

    #[test]
    fn keeps_image_flavor() {
        let list = tags(&["2.8.4", "2.8.4-alpine", "2.7.6-alpine", "2.9.0-beta.1-alpine"]);
        assert_eq!(tag_flavor("2.8.4-alpine"), "-alpine");
        assert_eq!(tag_flavor("v12.2.0"), "");
        assert_eq!(
            newest_matching(&list, "2-alpine"),
            Some("2.8.4-alpine".to_string())
        );
        assert_eq!(newest_matching(&list, "2.7.0"), Some("2.8.4".to_string()));
    }

    #[test]
    fn latest_current_never_has_update() {
        let candidate = VersionCandidate {
            service: ServiceKind::WorkflowEngine,
            image: "n8nio/n8n",
            current: "latest".into(),
            latest: Some("1.64.0".into()),
        };
        assert!(!candidate.has_update());
    }

    #[test]
    fn reads_versions_of_enabled_services() {
        let env: HashMap<String, String> = [
            ("WORKFLOW_ENGINE_ENABLED", "true"),
            ("WORKFLOW_ENGINE_VERSION", "1.64.0"),
            ("MODEL_RUNNER_ENABLED", "false"),
            ("MODEL_RUNNER_VERSION", "0.3.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let versions = current_versions(&env);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[&ServiceKind::WorkflowEngine], "1.64.0");
    }

    #[test]
    fn pinned_versions_ignore_enabled_flags_and_blanks() {
        let env: HashMap<String, String> = [
            ("PROXY_VERSION", "2.8.4-alpine"),
            ("PROXY_ENABLED", "false"),
            ("MODEL_RUNNER_VERSION", " "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let pinned = pinned_versions(&env);
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[&ServiceKind::Proxy], "2.8.4-alpine");
        assert!(current_versions(&env).is_empty());
    }

    #[test]
    fn updates_target_version_keys() {
        let selected = vec![VersionCandidate {
            service: ServiceKind::Database,
            image: "supabase/postgres",
            current: "15.8.1.060".into(),
            latest: Some("15.8.1.100".into()),
        }];
        assert_eq!(
            version_updates(&selected),
            vec![("DATABASE_VERSION".to_string(), "15.8.1.100".to_string())]
        );
    }
}
