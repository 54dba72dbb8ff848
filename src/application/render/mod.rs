//! Artifact rendering: env file, orchestration manifest, proxy files.
//!
//! Rendering is a pure function of the plan, routing and install input.
//! Identical inputs give byte-identical output.

pub mod env;
pub mod manifest;
pub mod proxy;
pub mod template;

use tracing::debug;

use crate::domain::artifact::{RenderedArtifacts, RenderedFile};
use crate::domain::input::InstallInput;
use crate::domain::plan::ResourcePlan;
use crate::domain::routing::RoutingConfig;
use crate::error::RenderError;

/// Env file path relative to the install root.
pub const ENV_FILE: &str = ".env";
/// Manifest path relative to the install root.
pub const MANIFEST_FILE: &str = "docker-compose.yml";

/// Renders the full artifact set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactRenderer;

impl ArtifactRenderer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Render env file, manifest and proxy files, in that order.
    pub fn render(
        &self,
        plan: &ResourcePlan,
        routing: &RoutingConfig,
        input: &InstallInput,
    ) -> Result<RenderedArtifacts, RenderError> {
        let env = env::render(plan, routing, input)?;
        let manifest = manifest::render(plan, routing)?;
        let proxy = proxy::render(plan, routing)?;

        debug!(
            mode = %routing.mode(),
            virtual_hosts = proxy.sites.len(),
            "Artifacts rendered"
        );

        Ok(RenderedArtifacts {
            env: RenderedFile::new(ENV_FILE, env),
            manifest: RenderedFile::new(MANIFEST_FILE, manifest),
            proxy_root: proxy.root,
            virtual_hosts: proxy.sites,
        })
    }
}
