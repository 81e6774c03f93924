use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a fixable pattern.
///
/// Each category is owned by exactly one fix provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixCategory {
    ConsoleLogs,
    DebuggerStatements,
}

impl FixCategory {
    pub const ALL: [FixCategory; 2] = [FixCategory::ConsoleLogs, FixCategory::DebuggerStatements];

    /// Stable key used in config files and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            FixCategory::ConsoleLogs => "console_logs",
            FixCategory::DebuggerStatements => "debugger_statements",
        }
    }

    /// Human label used in previews and commit messages.
    pub fn label(self) -> &'static str {
        match self {
            FixCategory::ConsoleLogs => "console.log statements",
            FixCategory::DebuggerStatements => "debugger statements",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for FixCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Ast,
    Regex,
}

/// Where a matched call sits in the surrounding code.
///
/// Only a standalone statement can be deleted; the other sites keep a
/// placeholder so the enclosing construct still parses the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSite {
    #[default]
    Statement,
    /// The whole body of an unbraced `if`, `else`, loop or label.
    ControlBody,
    /// An operand of a larger expression statement (`ready && console.log(x)`).
    Expression,
}

impl CandidateSite {
    /// Text left where the matched span was.
    pub fn placeholder(self) -> &'static str {
        match self {
            CandidateSite::Statement => "",
            CandidateSite::ControlBody => "{}",
            CandidateSite::Expression => "void 0",
        }
    }

    pub fn is_statement(&self) -> bool {
        *self == CandidateSite::Statement
    }
}

/// A located, confidence-scored suggestion that source text can be removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixCandidate {
    pub file: Utf8PathBuf,

    /// 1-based line of the statement start.
    pub line: usize,

    /// 1-based column of the statement start.
    pub column: usize,

    /// 1-based line where the statement ends, when the detector knows it.
    /// `None` leaves span detection to the change builder's forward scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    pub category: FixCategory,

    /// The statement text as it appears in the source, including the
    /// terminating `;` when present.
    pub matched_text: String,

    /// In `[0, 1]`.
    pub confidence: f64,

    pub source: DetectionSource,

    #[serde(default, skip_serializing_if = "CandidateSite::is_statement")]
    pub site: CandidateSite,
}

impl FixCandidate {
    pub fn is_multi_line(&self) -> bool {
        self.end_line.is_some_and(|end| end > self.line) || self.matched_text.contains('\n')
    }
}
