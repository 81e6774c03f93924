//! Working-tree guard: status, clean-tree precondition and recovery branches.

use crate::error::{FixError, PreconditionError};
use crate::ports::VcsPort;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SecondsFormat, Utc};
use safefix_types::vcs::VcsState;
use tracing::{info, warn};

pub struct VcsGuard<'a> {
    port: &'a dyn VcsPort,
    root: Utf8PathBuf,
    prefix: String,
}

impl<'a> VcsGuard<'a> {
    pub fn new(port: &'a dyn VcsPort, root: &Utf8Path, prefix: &str) -> Self {
        Self {
            port,
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn check_status(&self) -> anyhow::Result<VcsState> {
        let status = self
            .port
            .status(&self.root)
            .with_context(|| format!("query vcs status of {}", self.root))?;
        Ok(match status {
            None => VcsState::no_repository(),
            Some(s) => VcsState {
                repository: true,
                clean: s.dirty_paths.is_empty(),
                branch: s.branch,
                head: s.head,
                recovery_branch: None,
                dirty_paths: s.dirty_paths,
            },
        })
    }

    /// A missing repository passes: there is nothing to keep clean.
    pub fn require_clean(&self, state: &VcsState) -> Result<(), PreconditionError> {
        if !state.repository {
            warn!(root = %self.root, "not a git repository; skipping clean-tree check");
            return Ok(());
        }
        if state.is_dirty() {
            return Err(PreconditionError::DirtyTree {
                paths: state.dirty_paths.clone(),
            });
        }
        Ok(())
    }

    /// Create a timestamp-named branch at HEAD without switching to it.
    ///
    /// Returns `None` outside a repository. The branch is never deleted by
    /// safefix.
    pub fn create_recovery_point(&self, state: &mut VcsState) -> anyhow::Result<Option<String>> {
        if !state.repository {
            return Ok(None);
        }
        let base = recovery_branch_name(&self.prefix, Utc::now());
        let mut name = base.clone();
        let mut n = 1;
        while self.port.branch_exists(&self.root, &name)? {
            name = format!("{base}-{n}");
            n += 1;
        }
        self.port
            .create_branch(&self.root, &name)
            .with_context(|| format!("create recovery branch {name}"))?;
        info!(branch = %name, "recovery branch created");
        state.recovery_branch = Some(name.clone());
        Ok(Some(name))
    }

    pub fn restore_from_recovery_point(&self, name: &str) -> Result<(), FixError> {
        if self.port.status(&self.root)?.is_none() {
            return Err(PreconditionError::NoRepository {
                root: self.root.to_string(),
            }
            .into());
        }
        if !self.port.branch_exists(&self.root, name)? {
            return Err(PreconditionError::MissingRecoveryBranch {
                name: name.to_string(),
            }
            .into());
        }
        self.port
            .reset_hard(&self.root, name)
            .with_context(|| format!("reset to {name}"))?;
        info!(branch = %name, "working tree reset to recovery branch");
        Ok(())
    }
}

/// `<prefix>-backup-<RFC 3339 UTC, millis>` with `:` and `.` replaced by `-`.
pub fn recovery_branch_name(prefix: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{prefix}-backup-{stamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::VcsStatus;
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeVcs {
        status: Option<VcsStatus>,
        branches: RefCell<Vec<String>>,
        resets: RefCell<Vec<String>>,
    }

    impl VcsPort for FakeVcs {
        fn status(&self, _: &Utf8Path) -> anyhow::Result<Option<VcsStatus>> {
            Ok(self.status.clone())
        }
        fn branch_exists(&self, _: &Utf8Path, name: &str) -> anyhow::Result<bool> {
            Ok(self.branches.borrow().iter().any(|b| b == name))
        }
        fn create_branch(&self, _: &Utf8Path, name: &str) -> anyhow::Result<()> {
            self.branches.borrow_mut().push(name.to_string());
            Ok(())
        }
        fn reset_hard(&self, _: &Utf8Path, name: &str) -> anyhow::Result<()> {
            self.resets.borrow_mut().push(name.to_string());
            Ok(())
        }
        fn commit(&self, _: &Utf8Path, _: &[Utf8PathBuf], _: &str) -> anyhow::Result<String> {
            Ok("0".repeat(40))
        }
    }

    fn repo(dirty: &[&str]) -> FakeVcs {
        FakeVcs {
            status: Some(VcsStatus {
                branch: Some("main".into()),
                head: Some("abc".into()),
                dirty_paths: dirty.iter().map(|s| s.to_string()).collect(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn branch_name_replaces_colons_and_dots() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            recovery_branch_name("safefix", at),
            "safefix-backup-2024-03-09T14-05-07-000Z"
        );
    }

    #[test]
    fn dirty_tree_is_a_precondition_error() {
        let vcs = repo(&["src/a.js"]);
        let guard = VcsGuard::new(&vcs, Utf8Path::new("."), "safefix");
        let state = guard.check_status().unwrap();
        assert!(state.is_dirty());
        assert_eq!(
            guard.require_clean(&state),
            Err(PreconditionError::DirtyTree {
                paths: vec!["src/a.js".into()]
            })
        );
    }

    #[test]
    fn no_repository_passes_clean_check_and_skips_branch() {
        let vcs = FakeVcs::default();
        let guard = VcsGuard::new(&vcs, Utf8Path::new("."), "safefix");
        let mut state = guard.check_status().unwrap();
        assert!(!state.repository);
        assert!(guard.require_clean(&state).is_ok());
        assert_eq!(guard.create_recovery_point(&mut state).unwrap(), None);
        assert!(vcs.branches.borrow().is_empty());
    }

    #[test]
    fn recovery_point_is_unique_and_recorded() {
        let vcs = repo(&[]);
        let guard = VcsGuard::new(&vcs, Utf8Path::new("."), "safefix");
        let mut state = guard.check_status().unwrap();
        let first = guard.create_recovery_point(&mut state).unwrap().unwrap();
        assert!(first.starts_with("safefix-backup-"));
        assert_eq!(state.recovery_branch.as_deref(), Some(first.as_str()));

        // Within the same millisecond the second name gets a numeric suffix.
        let second = guard.create_recovery_point(&mut state).unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn restore_requires_existing_branch() {
        let vcs = repo(&[]);
        let guard = VcsGuard::new(&vcs, Utf8Path::new("."), "safefix");
        let err = guard.restore_from_recovery_point("safefix-backup-gone").unwrap_err();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("safefix-backup-gone"));
        assert!(vcs.resets.borrow().is_empty());

        vcs.branches.borrow_mut().push("safefix-backup-1".into());
        guard.restore_from_recovery_point("safefix-backup-1").unwrap();
        assert_eq!(*vcs.resets.borrow(), vec!["safefix-backup-1".to_string()]);
    }

    #[test]
    fn restore_outside_repository_fails() {
        let vcs = FakeVcs::default();
        let guard = VcsGuard::new(&vcs, Utf8Path::new("."), "safefix");
        let err = guard.restore_from_recovery_point("any").unwrap_err();
        assert!(matches!(
            err,
            FixError::Precondition(PreconditionError::NoRepository { .. })
        ));
    }
}
