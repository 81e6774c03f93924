//! Port traits abstracting all side effects away from the pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use safefix_types::change::{ChangeSummary, FileChanges};
use std::time::Duration;

/// Repository status as reported by the VCS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsStatus {
    pub branch: Option<String>,
    pub head: Option<String>,
    /// Modified, staged or untracked paths. Empty means clean.
    pub dirty_paths: Vec<String>,
}

/// Version-control operations.
pub trait VcsPort {
    /// `Ok(None)` when `root` is not inside a repository.
    fn status(&self, root: &Utf8Path) -> anyhow::Result<Option<VcsStatus>>;

    fn branch_exists(&self, root: &Utf8Path, name: &str) -> anyhow::Result<bool>;

    /// Create `name` at HEAD without switching to it.
    fn create_branch(&self, root: &Utf8Path, name: &str) -> anyhow::Result<()>;

    /// Hard-reset the working tree to `name`.
    fn reset_hard(&self, root: &Utf8Path, name: &str) -> anyhow::Result<()>;

    /// Stage `paths` and commit them. Returns the new commit id.
    fn commit(
        &self,
        root: &Utf8Path,
        paths: &[Utf8PathBuf],
        message: &str,
    ) -> anyhow::Result<String>;
}

/// Top-level answer at PREVIEW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    AcceptAll,
    ReviewPerFile,
    SkipAll,
    Abort,
}

/// Answer for one file during per-file review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDecision {
    Accept,
    Reject,
    /// Keep only these edits (0-based indices into the file's edits).
    Pick(Vec<usize>),
}

/// The two points where a run waits for the operator.
pub trait DecisionProvider {
    fn decide(&mut self, summary: &ChangeSummary, preview: &str) -> anyhow::Result<Decision>;

    fn review_file(&mut self, file: &FileChanges, diff: &str) -> anyhow::Result<FileDecision>;

    fn confirm_commit(&mut self, message: &str) -> anyhow::Result<bool>;
}

/// Result of running one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when killed by a signal or on timeout.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    /// Combined stdout and stderr, tail-truncated.
    pub output: String,
    pub truncated: bool,
    pub duration: Duration,
}

/// Executes validation commands.
pub trait CommandRunner {
    fn run(
        &self,
        command: &str,
        cwd: &Utf8Path,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> anyhow::Result<CommandOutput>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
}
