//! Preview and operator decisions over a change set.
//!
//! Diffs are computed against in-memory copies; nothing here writes to disk.

use crate::ports::{Decision, DecisionProvider, FileDecision};
use camino::{Utf8Path, Utf8PathBuf};
use safefix_edit::{plan_rewrites, render_file_diff, render_patch};
use safefix_types::change::{ChangeSet, ChangeSummary, FileChanges};
use tracing::{debug, info};

pub struct ChangePresenter {
    project_root: Utf8PathBuf,
}

impl ChangePresenter {
    pub fn new(project_root: &Utf8Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    pub fn summarize(&self, changes: &ChangeSet) -> ChangeSummary {
        changes.summary()
    }

    /// Unified diff of every file in `changes`.
    pub fn preview(&self, changes: &ChangeSet) -> anyhow::Result<String> {
        let rewrites = plan_rewrites(&self.project_root, changes)?;
        Ok(render_patch(&rewrites))
    }

    pub fn decide(
        &self,
        changes: &ChangeSet,
        preview: &str,
        decisions: &mut dyn DecisionProvider,
    ) -> anyhow::Result<Decision> {
        let decision = decisions.decide(&self.summarize(changes), preview)?;
        info!(?decision, edits = changes.total_edits(), "preview decision");
        Ok(decision)
    }

    /// Walk each file, ask the operator, and build a new change set from the
    /// answers. `changes` is left untouched.
    pub fn refine(
        &self,
        changes: &ChangeSet,
        decisions: &mut dyn DecisionProvider,
    ) -> anyhow::Result<ChangeSet> {
        let mut refined = ChangeSet::new();
        for file in changes.files.iter().filter(|f| !f.edits.is_empty()) {
            let diff = self.file_diff(file)?;
            let kept = match decisions.review_file(file, &diff)? {
                FileDecision::Accept => file.edits.clone(),
                FileDecision::Reject => Vec::new(),
                FileDecision::Pick(indices) => indices
                    .iter()
                    .filter_map(|&i| file.edits.get(i).cloned())
                    .collect(),
            };
            debug!(
                file = %file.path,
                kept = kept.len(),
                offered = file.edits.len(),
                "file reviewed"
            );
            refined.extend_file(&file.path, kept);
        }
        Ok(refined)
    }

    fn file_diff(&self, file: &FileChanges) -> anyhow::Result<String> {
        let single = ChangeSet {
            files: vec![file.clone()],
        };
        let rewrites = plan_rewrites(&self.project_root, &single)?;
        Ok(rewrites
            .first()
            .map(|r| render_file_diff(&r.path, &r.before, &r.after))
            .unwrap_or_default())
    }
}
