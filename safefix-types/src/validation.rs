use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// No command configured or discoverable; never counts as a failure.
    Skipped,
}

/// Result of running one named check command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    pub status: CheckStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default)]
    pub timed_out: bool,

    /// Combined stdout + stderr, bounded in size.
    #[serde(default)]
    pub output: String,

    #[serde(default)]
    pub truncated: bool,

    #[serde(default)]
    pub duration_ms: u64,
}

impl CheckOutcome {
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: None,
            status: CheckStatus::Skipped,
            exit_code: None,
            timed_out: false,
            output: reason.into(),
            truncated: false,
            duration_ms: 0,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }
}

/// Aggregate of every configured check, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub checks: Vec<CheckOutcome>,
    pub success: bool,
}

impl ValidationOutcome {
    pub fn from_checks(checks: Vec<CheckOutcome>) -> Self {
        let success = !checks.iter().any(CheckOutcome::failed);
        Self { checks, success }
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| c.failed())
    }

    /// True when at least one check actually ran.
    pub fn ran_any(&self) -> bool {
        self.checks
            .iter()
            .any(|c| c.status != CheckStatus::Skipped)
    }
}
