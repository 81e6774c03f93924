//! Embeddable core library for safefix.
//!
//! Provides a clap-free, I/O-abstracted transaction engine that detects
//! debug statements, previews them, backs files up, applies the edits,
//! validates the project and either keeps or rolls back the result.
//!
//! # Port traits
//!
//! All side effects are abstracted behind port traits in [`ports`]:
//! - [`VcsPort`](ports::VcsPort): query git state, create and reset to branches, commit
//! - [`DecisionProvider`](ports::DecisionProvider): the operator's answers at PREVIEW and COMMIT
//! - [`CommandRunner`](ports::CommandRunner): run validation commands under a timeout
//! - [`WritePort`](ports::WritePort): write files
//!
//! The [`adapters`] module provides process-, filesystem- and terminal-backed
//! implementations.
//!
//! # Entry point
//!
//! [`TransactionCoordinator::run`](pipeline::TransactionCoordinator::run)
//! drives one transaction and returns a single
//! [`TransactionResult`](safefix_types::outcome::TransactionResult).

pub mod adapters;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod presenter;
pub mod settings;
pub mod validator;
pub mod vcs;

pub use error::{FixError, FixResult, PreconditionError};
pub use pipeline::{RunReport, TransactionCoordinator};
pub use settings::FixSettings;

// Re-exported so callers don't need safefix-domain or safefix-edit directly.
pub use safefix_domain::{ProviderMeta, builtin_provider_metas};
pub use safefix_edit::{SnapshotInfo, SnapshotStore};
