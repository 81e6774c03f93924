use crate::change::ChangeSummary;
use crate::validation::ValidationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coordinator phase. A result records the last phase reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Preflight,
    Collect,
    Preview,
    Backup,
    Apply,
    Validate,
    Commit,
    Rollback,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Preflight => "preflight",
            Phase::Collect => "collect",
            Phase::Preview => "preview",
            Phase::Backup => "backup",
            Phase::Apply => "apply",
            Phase::Validate => "validate",
            Phase::Commit => "commit",
            Phase::Rollback => "rollback",
        }
    }
}

/// The single record every transaction converges into.
///
/// Only the invoking CLI layer maps this to an exit code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResult {
    pub schema: String,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub success: bool,
    pub files_modified: u64,
    pub changes_applied: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,

    #[serde(default)]
    pub errors: Vec<String>,

    pub phase: Phase,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub rolled_back: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restore_failures: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ChangeSummary>,

    /// Commit created after a successful run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl TransactionResult {
    pub fn new(phase: Phase) -> Self {
        Self {
            schema: crate::schema::SAFEFIX_RESULT_V1.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            success: true,
            files_modified: 0,
            changes_applied: 0,
            backup_id: None,
            errors: vec![],
            phase,
            dry_run: false,
            rolled_back: false,
            restore_failures: vec![],
            recovery_branch: None,
            validation: None,
            summary: None,
            commit: None,
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.errors.push(message.into());
    }

    pub fn finish(mut self) -> Self {
        self.ended_at = Some(Utc::now());
        self
    }

    /// 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.success { 0 } else { 1 }
    }
}
