//! File snapshots taken before a transaction writes anything.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<id>/snapshot.json
//! <root>/<id>/files/<project-relative path>
//! <root>/<id>/files/_abs/<absolute path outside the project>
//! ```
//!
//! Mirroring the relative path keeps `a/util.js` and `b/util.js` apart, and
//! `..` is mirrored as `_up` so `../x.js` never lands on `x.js`.

use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Duration, Utc};
use fs_err as fs;
use safefix_types::schema::SAFEFIX_SNAPSHOT_V1;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MANIFEST: &str = "snapshot.json";
const FILES_DIR: &str = "files";
const ABS_DIR: &str = "_abs";
const PARENT_DIR: &str = "_up";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Absolute path of the backup copy.
    pub backup_path: Utf8PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// One transaction's backups. Consumed by exactly one of
/// [`SnapshotStore::restore`] or [`SnapshotStore::cleanup`].
#[derive(Debug)]
pub struct SnapshotHandle {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub dir: Utf8PathBuf,
    /// Original path (as passed to `create`) to its backup.
    pub entries: BTreeMap<Utf8PathBuf, BackupEntry>,
    /// Paths that could not be backed up, with the reason.
    pub excluded: Vec<(Utf8PathBuf, String)>,
}

impl SnapshotHandle {
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.entries.contains_key(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    pub path: Utf8PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<Utf8PathBuf>,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    schema: String,
    id: String,
    created_at: DateTime<Utc>,
    project_root: Utf8PathBuf,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    original: Utf8PathBuf,
    /// Relative to the snapshot directory.
    backup: Utf8PathBuf,
    sha256: String,
    bytes: u64,
}

/// Snapshot as listed from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub files: usize,
    pub dir: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: Utf8PathBuf,
    project_root: Utf8PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<Utf8PathBuf>, project_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            project_root: project_root.into(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Copy each path into a fresh snapshot directory.
    ///
    /// Unreadable files are recorded in `excluded` and logged; they never fail
    /// the call. Only failure to create the snapshot directory or manifest
    /// is an error.
    pub fn create(&self, paths: &[Utf8PathBuf]) -> anyhow::Result<SnapshotHandle> {
        let created_at = Utc::now();
        let id = snapshot_id(created_at);
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir).with_context(|| format!("create snapshot dir {}", dir))?;

        let mut entries = BTreeMap::new();
        let mut excluded = Vec::new();
        for path in paths {
            if entries.contains_key(path) {
                continue;
            }
            match self.copy_one(&dir, path) {
                Ok(entry) => {
                    debug!(file = %path, backup = %entry.backup_path, "backed up");
                    entries.insert(path.clone(), entry);
                }
                Err(e) => {
                    warn!(
                        file = %path,
                        error = %format!("{e:#}"),
                        "cannot back up file; excluding it"
                    );
                    excluded.push((path.clone(), format!("{e:#}")));
                }
            }
        }

        let handle = SnapshotHandle {
            id,
            created_at,
            dir,
            entries,
            excluded,
        };
        self.write_manifest(&handle)?;
        info!(
            id = %handle.id,
            files = handle.entries.len(),
            excluded = handle.excluded.len(),
            "snapshot created"
        );
        Ok(handle)
    }

    fn copy_one(&self, dir: &Utf8Path, path: &Utf8Path) -> anyhow::Result<BackupEntry> {
        let source = self.abs(path);
        let bytes = fs::read(&source)?;
        let backup_path = dir.join(FILES_DIR).join(self.mirror_path(path));
        if let Some(parent) = backup_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&backup_path, &bytes)?;
        Ok(BackupEntry {
            backup_path,
            sha256: sha256_hex(&bytes),
            bytes: bytes.len() as u64,
        })
    }

    /// Where a path lives under `files/`.
    ///
    /// The mapping is injective: `..` becomes the reserved `_up` segment and
    /// any real segment starting with `_` gains one more underscore.
    fn mirror_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        let (mut out, rel) = match path.strip_prefix(&self.project_root) {
            Ok(rel) if path.is_absolute() => (Utf8PathBuf::new(), rel),
            _ if path.is_absolute() => (Utf8PathBuf::from(ABS_DIR), path),
            _ => (Utf8PathBuf::new(), path),
        };
        for c in rel.components() {
            match c {
                Utf8Component::Normal(part) if part.starts_with('_') => {
                    out.push(format!("_{part}"))
                }
                Utf8Component::Normal(part) => out.push(part),
                Utf8Component::ParentDir => out.push(PARENT_DIR),
                Utf8Component::Prefix(prefix) => out.push(prefix.as_str().replace(':', "")),
                Utf8Component::RootDir | Utf8Component::CurDir => {}
            }
        }
        out
    }

    fn abs(&self, path: &Utf8Path) -> Utf8PathBuf {
        crate::abs_path(&self.project_root, path)
    }

    fn write_manifest(&self, handle: &SnapshotHandle) -> anyhow::Result<()> {
        let manifest = Manifest {
            schema: SAFEFIX_SNAPSHOT_V1.to_string(),
            id: handle.id.clone(),
            created_at: handle.created_at,
            project_root: self.project_root.clone(),
            entries: handle
                .entries
                .iter()
                .map(|(original, e)| ManifestEntry {
                    original: original.clone(),
                    backup: e
                        .backup_path
                        .strip_prefix(&handle.dir)
                        .map(Utf8Path::to_path_buf)
                        .unwrap_or_else(|_| e.backup_path.clone()),
                    sha256: e.sha256.clone(),
                    bytes: e.bytes,
                })
                .collect(),
        };
        let path = handle.dir.join(MANIFEST);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, json).with_context(|| format!("write {}", path))?;
        Ok(())
    }

    /// True only if every backup is present and still matches its hash.
    pub fn verify(&self, handle: &SnapshotHandle) -> bool {
        handle
            .entries
            .values()
            .all(|e| backup_problem(e).is_none())
    }

    /// Copy every backup over its original.
    ///
    /// One file's failure does not stop the rest. The snapshot directory is
    /// removed only when every file was restored; otherwise it stays for
    /// manual recovery.
    pub fn restore(&self, handle: SnapshotHandle) -> RestoreReport {
        let mut report = RestoreReport::default();
        for (original, entry) in &handle.entries {
            let result = match backup_problem(entry) {
                Some(problem) => Err(anyhow::anyhow!(problem)),
                None => self.restore_one(original, entry),
            };
            match result {
                Ok(()) => report.restored.push(original.clone()),
                Err(e) => {
                    warn!(file = %original, error = %format!("{e:#}"), "restore failed");
                    report.failures.push(RestoreFailure {
                        path: original.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        if report.is_complete() {
            self.remove_dir(&handle.dir);
        } else {
            warn!(
                id = %handle.id,
                dir = %handle.dir,
                failed = report.failures.len(),
                "snapshot kept for manual recovery"
            );
        }
        info!(
            id = %handle.id,
            restored = report.restored.len(),
            failed = report.failures.len(),
            "snapshot restored"
        );
        report
    }

    fn restore_one(&self, original: &Utf8Path, entry: &BackupEntry) -> anyhow::Result<()> {
        let bytes = fs::read(&entry.backup_path)?;
        let target = self.abs(original);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(())
    }

    /// Delete the snapshot directory. Missing directories are fine.
    pub fn cleanup(&self, handle: SnapshotHandle) {
        self.remove_dir(&handle.dir);
        debug!(id = %handle.id, "snapshot cleaned up");
    }

    fn remove_dir(&self, dir: &Utf8Path) {
        if !dir.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!(dir = %dir, error = %e, "cannot remove snapshot directory");
        }
    }

    /// Snapshots left on disk by earlier runs, oldest first.
    pub fn list(&self) -> anyhow::Result<Vec<SnapshotInfo>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(self.root.as_std_path())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(dir) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            let id = dir.file_name().unwrap_or_default().to_string();
            let manifest = read_manifest(&dir);
            out.push(SnapshotInfo {
                id,
                created_at: manifest.as_ref().map(|m| m.created_at),
                files: manifest.as_ref().map(|m| m.entries.len()).unwrap_or(0),
                dir,
            });
        }
        out.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(out)
    }

    /// Remove snapshots older than `max_age_hours`. Directories without a
    /// readable manifest are judged by modification time.
    pub fn gc(&self, max_age_hours: u64) -> anyhow::Result<Vec<String>> {
        let cutoff = i64::try_from(max_age_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            return Ok(Vec::new());
        };
        let mut removed = Vec::new();
        for info in self.list()? {
            let created = info.created_at.or_else(|| modified_at(&info.dir));
            if created.is_some_and(|t| t < cutoff) {
                self.remove_dir(&info.dir);
                removed.push(info.id);
            }
        }
        info!(removed = removed.len(), max_age_hours, "snapshot gc finished");
        Ok(removed)
    }

    /// Rebuild a handle from a snapshot left on disk.
    pub fn open(&self, id: &str) -> anyhow::Result<SnapshotHandle> {
        let dir = self.root.join(id);
        let manifest =
            read_manifest(&dir).with_context(|| format!("no snapshot manifest in {dir}"))?;
        Ok(SnapshotHandle {
            id: manifest.id,
            created_at: manifest.created_at,
            entries: manifest
                .entries
                .into_iter()
                .map(|e| {
                    (
                        e.original,
                        BackupEntry {
                            backup_path: dir.join(e.backup),
                            sha256: e.sha256,
                            bytes: e.bytes,
                        },
                    )
                })
                .collect(),
            dir,
            excluded: Vec::new(),
        })
    }
}

fn read_manifest(dir: &Utf8Path) -> Option<Manifest> {
    let text = fs::read_to_string(dir.join(MANIFEST)).ok()?;
    serde_json::from_str(&text).ok()
}

fn modified_at(dir: &Utf8Path) -> Option<DateTime<Utc>> {
    let meta = fs::metadata(dir).ok()?;
    meta.modified().ok().map(DateTime::<Utc>::from)
}

fn backup_problem(entry: &BackupEntry) -> Option<String> {
    match fs::read(&entry.backup_path) {
        Err(e) => Some(format!("backup unreadable: {e}")),
        Ok(bytes) if sha256_hex(&bytes) != entry.sha256 => {
            Some(format!("backup {} is corrupt (hash mismatch)", entry.backup_path))
        }
        Ok(_) => None,
    }
}

fn snapshot_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", at.format("%Y%m%dT%H%M%S"), &suffix[..8])
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_keeps_relative_structure() {
        let store = SnapshotStore::new("/tmp/snaps", "/work/proj");
        assert_eq!(
            store.mirror_path(Utf8Path::new("a/util.js")),
            Utf8PathBuf::from("a/util.js")
        );
        assert_eq!(
            store.mirror_path(Utf8Path::new("/work/proj/b/util.js")),
            Utf8PathBuf::from("b/util.js")
        );
        assert_eq!(
            store.mirror_path(Utf8Path::new("/elsewhere/x.js")),
            Utf8PathBuf::from("_abs/elsewhere/x.js")
        );
        assert_eq!(
            store.mirror_path(Utf8Path::new("../up/y.js")),
            Utf8PathBuf::from("_up/up/y.js")
        );
    }

    #[test]
    fn mirror_never_maps_two_paths_to_one_backup() {
        let store = SnapshotStore::new("/tmp/snaps", "/work/proj");
        let paths = [
            "up/y.js",
            "../up/y.js",
            "_up/up/y.js",
            "__up/up/y.js",
            "_abs/elsewhere/x.js",
            "/elsewhere/x.js",
            "/work/proj/_x.js",
            "__x.js",
        ];
        let mut mirrored: Vec<Utf8PathBuf> =
            paths.iter().map(|p| store.mirror_path(Utf8Path::new(p))).collect();
        mirrored.sort();
        mirrored.dedup();
        assert_eq!(mirrored.len(), paths.len(), "{mirrored:?}");
    }

    #[test]
    fn ids_are_unique_and_sortable() {
        let now = Utc::now();
        let a = snapshot_id(now);
        let b = snapshot_id(now);
        assert_ne!(a, b);
        assert_eq!(a.len(), "20260101T000000-".len() + 8);
    }
}
