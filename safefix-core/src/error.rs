//! Error taxonomy for the transaction pipeline.
//!
//! - Precondition errors (exit code 2): the operator must change something
//!   before a run can proceed. Raised before any file is written.
//! - Runtime errors (exit code 1): I/O faults, tool failures, internal bugs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixError {
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("{0:#}")]
    Runtime(#[from] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error(
        "working tree has uncommitted changes ({} path(s), first: {}); \
         commit or stash them, or set require_git_clean = false",
        .paths.len(),
        .paths.first().map(String::as_str).unwrap_or("?")
    )]
    DirtyTree { paths: Vec<String> },

    #[error("{root} is not inside a git repository")]
    NoRepository { root: String },

    #[error("recovery branch '{name}' does not exist")]
    MissingRecoveryBranch { name: String },

    #[error(
        "validation baseline is failing ({failed}); \
         fix the project first or set allow_red_baseline = true"
    )]
    RedBaseline { failed: String },

    #[error("backups are required but none could be taken: {reason}")]
    BackupRefused { reason: String },
}

impl FixError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, FixError::Precondition(_))
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            FixError::Precondition(_) => 2,
            FixError::Runtime(_) => 1,
        }
    }
}

pub type FixResult<T> = Result<T, FixError>;
