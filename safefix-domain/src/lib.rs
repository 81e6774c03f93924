//! Domain logic: turn a list of source files into a deterministic change set.
//!
//! This crate owns *what* should be removed and why. It does not own *how*
//! edits reach disk; that's the `safefix-edit` crate.

mod builder;
mod collector;
mod detect;
mod ports;
mod providers;
mod scan;
mod targets;
mod whitelist;

pub use builder::ChangeBuilder;
pub use collector::{Collection, CollectContext, Collector, CollectorConfig};
pub use detect::{DEFAULT_MIN_CONFIDENCE, DetectContext, Detector};
pub use ports::{FsRepoView, MAX_SOURCE_BYTES, RepoView};
pub use providers::{
    FixProvider, ProviderMeta, SourceFile, builtin_provider_metas, builtin_providers,
};
pub use scan::{SourceLanguage, is_test_file, parse_source};
pub use targets::discover_targets;
pub use whitelist::{DEFAULT_PRESERVE_MARKERS, Whitelist, WhitelistError};
