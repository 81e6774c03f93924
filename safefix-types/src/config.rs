//! Configuration DTOs shared by the config loader and the engine.

use crate::candidate::FixCategory;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 4096;

/// Which fix categories are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixTypes {
    pub console_logs: bool,
    pub debugger_statements: bool,
}

impl Default for FixTypes {
    fn default() -> Self {
        Self {
            console_logs: true,
            debugger_statements: true,
        }
    }
}

impl FixTypes {
    pub fn enabled(&self, category: FixCategory) -> bool {
        match category {
            FixCategory::ConsoleLogs => self.console_logs,
            FixCategory::DebuggerStatements => self.debugger_statements,
        }
    }

    pub fn only(category: FixCategory) -> Self {
        Self {
            console_logs: category == FixCategory::ConsoleLogs,
            debugger_statements: category == FixCategory::DebuggerStatements,
        }
    }
}

/// A named user-supplied check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommand {
    pub name: String,
    pub command: String,
}

/// Post-fix validation suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub run_tests: bool,
    pub run_type_check: bool,
    pub run_linter: bool,
    pub test_command: Option<String>,
    pub type_check_command: Option<String>,
    pub lint_command: Option<String>,
    pub custom_commands: Vec<CustomCommand>,
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            run_tests: true,
            run_type_check: true,
            run_linter: true,
            test_command: None,
            type_check_command: None,
            lint_command: None,
            custom_commands: vec![],
            timeout_secs: DEFAULT_CHECK_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ValidationConfig {
    /// A suite with nothing enabled.
    pub fn disabled() -> Self {
        Self {
            run_tests: false,
            run_type_check: false,
            run_linter: false,
            ..Self::default()
        }
    }

    pub fn is_disabled(&self) -> bool {
        !self.run_tests
            && !self.run_type_check
            && !self.run_linter
            && self.custom_commands.is_empty()
    }
}

/// Whitelist produced by the config loader.
///
/// `files` removes paths before collection; `patterns` and `comments` are
/// consulted per candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    pub files: Vec<String>,
    pub patterns: Vec<String>,
    pub comments: Vec<String>,
}

impl WhitelistConfig {
    pub fn extend(&mut self, other: &WhitelistConfig) {
        for (dst, src) in [
            (&mut self.files, &other.files),
            (&mut self.patterns, &other.patterns),
            (&mut self.comments, &other.comments),
        ] {
            for item in src {
                if !dst.contains(item) {
                    dst.push(item.clone());
                }
            }
        }
    }
}
