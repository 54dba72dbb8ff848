//! Rendered configuration artifacts.

use std::path::{Path, PathBuf};

/// A file produced by rendering, addressed relative to the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    path: PathBuf,
    contents: String,
}

impl RenderedFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }
}

/// The full output of one render: env file, manifest and proxy files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    pub env: RenderedFile,
    pub manifest: RenderedFile,
    /// Global proxy options; absent when the proxy is not deployed.
    pub proxy_root: Option<RenderedFile>,
    /// Virtual-host files, one per service or one combined.
    pub virtual_hosts: Vec<RenderedFile>,
}

impl RenderedArtifacts {
    /// Every file in write order: env, manifest, proxy root, virtual hosts.
    pub fn files(&self) -> impl Iterator<Item = &RenderedFile> {
        [&self.env, &self.manifest]
            .into_iter()
            .chain(self.proxy_root.iter())
            .chain(self.virtual_hosts.iter())
    }

    #[must_use]
    pub fn virtual_host_count(&self) -> usize {
        self.virtual_hosts.len()
    }
}
