//! Shared DTOs for the safefix workspace.
//!
//! # Design constraints
//! - Candidates and change sets are ephemeral; they are serialized only for
//!   `--json` output and tests.
//! - The transaction result and snapshot manifest are written to disk and read
//!   back across runs. Prefer adding optional fields over changing semantics.

pub mod candidate;
pub mod change;
pub mod config;
pub mod outcome;
pub mod validation;
pub mod vcs;

/// Schema identifiers.
pub mod schema {
    pub const SAFEFIX_RESULT_V1: &str = "safefix.result.v1";
    pub const SAFEFIX_SNAPSHOT_V1: &str = "safefix.snapshot.v1";
}
