//! Error types for safefix-edit.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Why a set of line edits could not be applied to a file's content.
///
/// Every variant means the content on disk no longer matches what the edits
/// were built against; nothing is written in that case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("{file}:{line}: line out of range (file has {len} lines)")]
    LineOutOfRange {
        file: Utf8PathBuf,
        line: usize,
        len: usize,
    },

    #[error(
        "{file}:{line}: content changed since detection \
         (expected `{expected}`, found `{found}`)"
    )]
    StaleText {
        file: Utf8PathBuf,
        line: usize,
        expected: String,
        found: String,
    },

    #[error("{file}:{line}: more than one edit rewrites this line")]
    Overlap { file: Utf8PathBuf, line: usize },
}
