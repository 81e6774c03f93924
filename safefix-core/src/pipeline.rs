//! The transaction coordinator.
//!
//! ```text
//! PREFLIGHT -> COLLECT -> PREVIEW -> [BACKUP] -> APPLY -> VALIDATE -> COMMIT
//!                                                                  \-> ROLLBACK
//! ```
//!
//! Every path that writes a file ends in either a passing validation or a
//! restore attempt. All side effects go through the port traits.

use crate::error::{FixError, FixResult, PreconditionError};
use crate::ports::{CommandRunner, Decision, DecisionProvider, VcsPort, WritePort};
use crate::presenter::ChangePresenter;
use crate::settings::FixSettings;
use crate::validator::Validator;
use crate::vcs::VcsGuard;
use camino::{Utf8Path, Utf8PathBuf};
use safefix_domain::{CollectContext, Collector, FsRepoView, discover_targets};
use safefix_edit::{SnapshotHandle, SnapshotStore, plan_rewrites};
use safefix_render::render_commit_message;
use safefix_types::change::ChangeSet;
use safefix_types::outcome::{Phase, TransactionResult};
use tracing::{debug, error, info, warn};

/// Outcome of one transaction.
#[derive(Debug)]
pub struct RunReport {
    pub result: TransactionResult,
    /// The error that stopped the run early, if any. Already recorded in
    /// `result.errors`; kept typed so embedders can tell preconditions apart.
    pub error: Option<FixError>,
    /// Unified diff of the collected changes, when any were found.
    pub preview: Option<String>,
}

impl RunReport {
    /// 2 for a precondition stop, otherwise the result's 0/1.
    pub fn exit_code(&self) -> u8 {
        match &self.error {
            Some(e) if e.is_precondition() => e.exit_code(),
            _ => self.result.exit_code(),
        }
    }
}

pub struct TransactionCoordinator<'a> {
    settings: FixSettings,
    vcs: &'a dyn VcsPort,
    runner: &'a dyn CommandRunner,
    writer: &'a dyn WritePort,
    decisions: &'a mut dyn DecisionProvider,
    collector: Collector,
    phase: Phase,
    preview: Option<String>,
}

impl<'a> TransactionCoordinator<'a> {
    pub fn new(
        settings: FixSettings,
        vcs: &'a dyn VcsPort,
        runner: &'a dyn CommandRunner,
        writer: &'a dyn WritePort,
        decisions: &'a mut dyn DecisionProvider,
    ) -> Self {
        Self {
            settings,
            vcs,
            runner,
            writer,
            decisions,
            collector: Collector::new(),
            phase: Phase::Preflight,
            preview: None,
        }
    }

    /// Replace the built-in providers.
    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.collector = collector;
        self
    }

    pub fn run(&mut self) -> TransactionResult {
        self.run_detailed().result
    }

    pub fn run_detailed(&mut self) -> RunReport {
        self.phase = Phase::Preflight;
        self.preview = None;
        let mut result = TransactionResult::new(Phase::Preflight);
        result.dry_run = self.settings.dry_run;

        let error = match self.execute(&mut result) {
            Ok(()) => None,
            Err(e) => {
                error!(phase = self.phase.label(), error = %e, "transaction stopped");
                result.fail(e.to_string());
                Some(e)
            }
        };
        result.phase = self.phase;
        info!(
            success = result.success,
            phase = result.phase.label(),
            files_modified = result.files_modified,
            rolled_back = result.rolled_back,
            "transaction finished"
        );
        RunReport {
            result: result.finish(),
            error,
            preview: self.preview.take(),
        }
    }

    fn enter(&mut self, result: &mut TransactionResult, phase: Phase) {
        debug!(phase = phase.label(), "entering phase");
        self.phase = phase;
        result.phase = phase;
    }

    fn execute(&mut self, result: &mut TransactionResult) -> FixResult<()> {
        let root = self.settings.project_root.clone();

        // PREFLIGHT
        self.enter(result, Phase::Preflight);
        let guard = VcsGuard::new(self.vcs, &root, &self.settings.recovery_branch_prefix);
        let mut vcs_state = guard.check_status()?;
        if !self.settings.dry_run {
            if self.settings.require_git_clean {
                guard.require_clean(&vcs_state)?;
                match guard.create_recovery_point(&mut vcs_state) {
                    Ok(branch) => result.recovery_branch = branch,
                    Err(e) => warn!(
                        error = %format!("{e:#}"),
                        "could not create recovery branch; continuing without one"
                    ),
                }
            }
            if self.settings.verify_baseline {
                self.verify_baseline(&root)?;
            }
        }
        let store = SnapshotStore::new(self.settings.snapshot_root.clone(), root.clone());

        // COLLECT
        self.enter(result, Phase::Collect);
        let targets = discover_targets(&root, &self.settings.targets)?;
        let ctx = CollectContext {
            project_root: root.clone(),
            config: self.settings.collector_config(),
        };
        let collection = self
            .collector
            .collect(&ctx, &FsRepoView::new(root.clone()), &targets)?;
        let changes = collection.change_set;
        result.summary = Some(changes.summary());
        if changes.is_empty() {
            info!(files_scanned = collection.files_scanned, "nothing to fix");
            return Ok(());
        }

        // PREVIEW
        self.enter(result, Phase::Preview);
        let presenter = ChangePresenter::new(&root);
        let preview = presenter.preview(&changes)?;
        self.preview = Some(preview.clone());
        if self.settings.dry_run {
            self.enter(result, Phase::Apply);
            info!(
                edits = changes.total_edits(),
                files = changes.files_touched().len(),
                "dry run; no files written"
            );
            return Ok(());
        }
        let changes = match presenter.decide(&changes, &preview, &mut *self.decisions)? {
            Decision::AcceptAll => changes,
            Decision::ReviewPerFile => presenter.refine(&changes, &mut *self.decisions)?,
            Decision::SkipAll | Decision::Abort => return Ok(()),
        };
        if changes.is_empty() {
            info!("no edits accepted; nothing applied");
            return Ok(());
        }
        result.summary = Some(changes.summary());

        // BACKUP
        let (changes, snapshot) = if self.settings.require_backup {
            self.enter(result, Phase::Backup);
            let (changes, handle) = self.backup(&store, changes)?;
            result.backup_id = Some(handle.id.clone());
            result.summary = Some(changes.summary());
            (changes, Some(handle))
        } else {
            warn!("backups disabled; a failed validation cannot be rolled back");
            (changes, None)
        };

        // APPLY
        self.enter(result, Phase::Apply);
        let rewrites = match plan_rewrites(&root, &changes) {
            Ok(r) => r,
            Err(e) => {
                if let Some(handle) = snapshot {
                    store.cleanup(handle);
                }
                return Err(e.context("prepare rewrites").into());
            }
        };
        let mut written: Vec<Utf8PathBuf> = Vec::new();
        for rewrite in rewrites.iter().filter(|r| r.changed()) {
            let abs = root.join(&rewrite.path);
            if let Err(e) = self.writer.write_file(&abs, rewrite.after.as_bytes()) {
                error!(file = %rewrite.path, error = %format!("{e:#}"), "write failed");
                result.fail(format!("write {} failed: {e:#}", rewrite.path));
                self.rollback(result, &store, snapshot);
                return Ok(());
            }
            info!(file = %rewrite.path, edits = rewrite.edits, "applied");
            result.files_modified += 1;
            result.changes_applied += rewrite.edits as u64;
            written.push(rewrite.path.clone());
        }

        // VALIDATE
        self.enter(result, Phase::Validate);
        let validation = Validator::new(self.runner, &root, &self.settings.validation).run();
        let failed: Vec<String> = validation.failures().map(|c| c.name.clone()).collect();
        result.validation = Some(validation);
        if !failed.is_empty() {
            result.fail(format!("validation failed: {}", failed.join(", ")));
            self.rollback(result, &store, snapshot);
            return Ok(());
        }

        // COMMIT
        self.enter(result, Phase::Commit);
        if let Some(handle) = snapshot {
            store.cleanup(handle);
        }
        if vcs_state.repository && !written.is_empty() {
            self.commit(result, &root, &written, &changes);
        }
        Ok(())
    }

    fn verify_baseline(&self, root: &Utf8Path) -> FixResult<()> {
        info!("checking validation baseline");
        let outcome = Validator::new(self.runner, root, &self.settings.validation).run();
        if outcome.success {
            return Ok(());
        }
        let failed = outcome
            .failures()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if self.settings.allow_red_baseline {
            warn!(%failed, "baseline is failing; continuing as allowed");
            return Ok(());
        }
        Err(PreconditionError::RedBaseline { failed }.into())
    }

    /// Snapshot every touched file. Files that cannot be backed up are
    /// dropped from the change set.
    fn backup(
        &self,
        store: &SnapshotStore,
        changes: ChangeSet,
    ) -> FixResult<(ChangeSet, SnapshotHandle)> {
        let paths: Vec<Utf8PathBuf> = changes
            .files_touched()
            .into_iter()
            .map(Utf8Path::to_path_buf)
            .collect();
        let handle = store
            .create(&paths)
            .map_err(|e| PreconditionError::BackupRefused {
                reason: format!("{e:#}"),
            })?;
        if handle.excluded.is_empty() {
            return Ok((changes, handle));
        }

        for (path, reason) in &handle.excluded {
            warn!(file = %path, %reason, "not backed up; its edits are dropped");
        }
        let kept = changes.filter_files(|p| handle.contains(p));
        if kept.is_empty() {
            store.cleanup(handle);
            return Err(PreconditionError::BackupRefused {
                reason: "no target file could be backed up".to_string(),
            }
            .into());
        }
        Ok((kept, handle))
    }

    fn rollback(
        &mut self,
        result: &mut TransactionResult,
        store: &SnapshotStore,
        snapshot: Option<SnapshotHandle>,
    ) {
        let hint = match &result.recovery_branch {
            Some(branch) => format!("; recover manually with `safefix restore {branch}`"),
            None => String::new(),
        };
        let Some(handle) = snapshot else {
            warn!("no backup to roll back to");
            result
                .errors
                .push(format!("no backup was taken; modified files were left in place{hint}"));
            return;
        };

        self.enter(result, Phase::Rollback);
        let total = handle.entries.len();
        let report = store.restore(handle);
        result.rolled_back = true;
        for failure in &report.failures {
            result
                .restore_failures
                .push(format!("{}: {}", failure.path, failure.reason));
        }
        if report.is_complete() {
            info!(files = report.restored.len(), "rolled back");
        } else {
            error!(
                restored = report.restored.len(),
                failed = report.failures.len(),
                "rollback incomplete"
            );
            result.fail(format!(
                "rollback incomplete: {} of {total} file(s) not restored{hint}",
                report.failures.len()
            ));
        }
    }

    /// Commit failures are reported without undoing the fix.
    fn commit(
        &mut self,
        result: &mut TransactionResult,
        root: &Utf8Path,
        written: &[Utf8PathBuf],
        changes: &ChangeSet,
    ) {
        let message = render_commit_message(&changes.summary());
        let wanted = self.settings.commit_after
            || match self.decisions.confirm_commit(&message) {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "commit prompt failed; not committing");
                    false
                }
            };
        if !wanted {
            return;
        }
        match self.vcs.commit(root, written, &message) {
            Ok(sha) => {
                info!(commit = %sha, "changes committed");
                result.commit = Some(sha);
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "commit failed; fix kept");
                result
                    .errors
                    .push(format!("commit failed (changes kept): {e:#}"));
            }
        }
    }
}
