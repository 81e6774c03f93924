//! BDD harness (cucumber-rs).
//!
//! This crate exists to keep scenario tests isolated from the production
//! crates. [`Sandbox`] is the throwaway project every scenario runs in.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use safefix_core::FixSettings;
use safefix_types::config::{CustomCommand, ValidationConfig};
use tempfile::TempDir;

/// A project directory plus a separate snapshot directory, both removed on drop.
#[derive(Debug)]
pub struct Sandbox {
    _project: TempDir,
    _snapshots: TempDir,
    root: Utf8PathBuf,
    snapshots: Utf8PathBuf,
}

impl Sandbox {
    pub fn new() -> anyhow::Result<Self> {
        let project = tempfile::tempdir().context("create project dir")?;
        let snapshots = tempfile::tempdir().context("create snapshot dir")?;
        let root = utf8(project.path())?;
        let snap = utf8(snapshots.path())?;
        Ok(Self {
            _project: project,
            _snapshots: snapshots,
            root,
            snapshots: snap,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn snapshot_root(&self) -> &Utf8Path {
        &self.snapshots
    }

    pub fn write(&self, rel: &str, contents: &str) -> anyhow::Result<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(())
    }

    pub fn read(&self, rel: &str) -> anyhow::Result<String> {
        Ok(fs::read_to_string(self.root.join(rel))?)
    }

    /// Defaults, with only `checks` enabled for validation.
    pub fn settings(&self, checks: &[CustomCommand]) -> FixSettings {
        FixSettings {
            project_root: self.root.clone(),
            snapshot_root: self.snapshots.clone(),
            validation: ValidationConfig {
                custom_commands: checks.to_vec(),
                ..ValidationConfig::disabled()
            },
            ..FixSettings::default()
        }
    }
}

fn utf8(path: &std::path::Path) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| anyhow::anyhow!("non-UTF-8 temp path: {}", p.display()))
}
