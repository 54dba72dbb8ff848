//! Filesystem artifact store.
//!
//! Every file is written to a temp file in its target directory and renamed
//! into place. Site files and a proxy root from a previous render that the
//! new set does not contain are removed afterwards.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::application::render::proxy::{PROXY_ROOT, SITES_DIR, SITE_EXTENSION};
use crate::application::render::{ENV_FILE, MANIFEST_FILE};
use crate::domain::artifact::RenderedArtifacts;
use crate::error::{Error, Result};
use crate::port::outbound::store::{ArtifactStore, WriteReport};

/// Backup directory, relative to the install root.
pub const BACKUP_DIR: &str = "backups";

/// Artifact store rooted at an install directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn env_path(&self) -> PathBuf {
        self.root.join(ENV_FILE)
    }

    /// Site files currently on disk, relative to the root.
    fn existing_sites(&self) -> Result<BTreeSet<PathBuf>> {
        let dir = self.root.join(SITES_DIR);
        if !dir.is_dir() {
            return Ok(BTreeSet::new());
        }
        let mut sites = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == SITE_EXTENSION) {
                if let Some(name) = path.file_name() {
                    sites.insert(Path::new(SITES_DIR).join(name));
                }
            }
        }
        Ok(sites)
    }
}

/// Write `contents` to `path` through a sibling temp file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Replace values of existing keys in env text and append missing ones.
/// Comments, blank lines and ordering are kept.
#[must_use]
pub fn apply_env_updates(content: &str, updates: &[(String, String)]) -> String {
    let mut pending: Vec<&(String, String)> = updates.iter().collect();
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        let key = line
            .split_once('=')
            .map(|(k, _)| k.trim())
            .filter(|k| !k.starts_with('#'));
        match key.and_then(|k| pending.iter().position(|(uk, _)| uk == k)) {
            Some(index) => {
                let (k, v) = pending.remove(index);
                out.push_str(&format!("{k}={v}"));
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
    for (k, v) in pending {
        out.push_str(&format!("{k}={v}\n"));
    }
    out
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, artifacts: &RenderedArtifacts) -> Result<WriteReport> {
        let before = self.existing_sites()?;
        let mut report = WriteReport::default();

        for file in artifacts.files() {
            write_atomic(&self.root.join(file.path()), file.contents())?;
            debug!(path = %file.path().display(), "Artifact written");
            report.written.push(file.path().to_path_buf());
        }

        let keep: BTreeSet<&Path> = artifacts
            .virtual_hosts
            .iter()
            .map(|f| f.path())
            .collect();
        for stale in before.iter().filter(|p| !keep.contains(p.as_path())) {
            fs::remove_file(self.root.join(stale))?;
            info!(path = %stale.display(), "Stale site file removed");
            report.removed.push(stale.clone());
        }

        let root_file = self.root.join(PROXY_ROOT);
        if artifacts.proxy_root.is_none() && root_file.is_file() {
            fs::remove_file(&root_file)?;
            info!(path = PROXY_ROOT, "Stale proxy root removed");
            report.removed.push(PathBuf::from(PROXY_ROOT));
        }

        Ok(report)
    }

    fn read_env(&self) -> Result<HashMap<String, String>> {
        let path = self.env_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(&path)? {
            let (key, value) = item?;
            values.insert(key, value);
        }
        Ok(values)
    }

    fn update_env(&self, updates: &[(String, String)]) -> Result<()> {
        let path = self.env_path();
        let content = fs::read_to_string(&path)?;
        write_atomic(&path, &apply_env_updates(&content, updates))
    }

    fn backup(&self) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut dir = self.root.join(BACKUP_DIR).join(&stamp);
        let mut suffix = 1;
        while dir.exists() {
            dir = self.root.join(BACKUP_DIR).join(format!("{stamp}-{suffix}"));
            suffix += 1;
        }

        let mut files: Vec<PathBuf> = [ENV_FILE, MANIFEST_FILE, PROXY_ROOT]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        files.extend(self.existing_sites()?);

        fs::create_dir_all(&dir)?;
        for relative in files {
            let source = self.root.join(&relative);
            if !source.is_file() {
                continue;
            }
            let target = dir.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)?;
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::RenderedFile;

    fn artifacts(sites: &[&str]) -> RenderedArtifacts {
        RenderedArtifacts {
            env: RenderedFile::new(ENV_FILE, "A=1\n"),
            manifest: RenderedFile::new(MANIFEST_FILE, "services:\n"),
            proxy_root: Some(RenderedFile::new(PROXY_ROOT, "{\n}\n")),
            virtual_hosts: sites
                .iter()
                .map(|s| RenderedFile::new(Path::new(SITES_DIR).join(s), "site\n"))
                .collect(),
        }
    }

    #[test]
    fn env_updates_keep_layout() {
        let content = "# header\nA=1\n\nB=2\n";
        let updates = vec![
            ("B".to_string(), "3".to_string()),
            ("C".to_string(), "4".to_string()),
        ];
        assert_eq!(
            apply_env_updates(content, &updates),
            "# header\nA=1\n\nB=3\nC=4\n"
        );
    }

    #[test]
    fn commented_keys_are_not_replaced() {
        let updates = vec![("A".to_string(), "2".to_string())];
        assert_eq!(apply_env_updates("#A=1\n", &updates), "#A=1\nA=2\n");
    }

    #[test]
    fn write_removes_stale_sites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        store.write(&artifacts(&["a.caddy", "b.caddy"])).unwrap();
        let report = store.write(&artifacts(&["a.caddy"])).unwrap();

        assert_eq!(report.removed, vec![PathBuf::from("proxy/sites/b.caddy")]);
        assert!(dir.path().join("proxy/sites/a.caddy").exists());
        assert!(!dir.path().join("proxy/sites/b.caddy").exists());
    }

    #[test]
    fn backup_copies_current_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.write(&artifacts(&["a.caddy"])).unwrap();

        let backup = store.backup().unwrap();
        assert!(backup.starts_with(dir.path().join(BACKUP_DIR)));
        assert_eq!(fs::read_to_string(backup.join(ENV_FILE)).unwrap(), "A=1\n");
        assert!(backup.join("proxy/sites/a.caddy").exists());

        let second = store.backup().unwrap();
        assert_ne!(backup, second);
    }

    #[test]
    fn missing_env_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert!(store.read_env().unwrap().is_empty());
    }
}
