//! Clap-free settings for the fix pipeline.

use camino::Utf8PathBuf;
use safefix_domain::{CollectorConfig, DEFAULT_MIN_CONFIDENCE};
use safefix_types::config::{FixTypes, ValidationConfig, WhitelistConfig};

pub const DEFAULT_MAX_FILES_PER_RUN: usize = 100;
pub const DEFAULT_RECOVERY_PREFIX: &str = "safefix";

/// Fully resolved settings for one transaction.
#[derive(Debug, Clone)]
pub struct FixSettings {
    pub project_root: Utf8PathBuf,
    /// Files or directories to scan, relative to `project_root`. Empty scans the root.
    pub targets: Vec<Utf8PathBuf>,
    /// Where snapshot directories are allocated.
    pub snapshot_root: Utf8PathBuf,

    // Mode
    pub dry_run: bool,
    pub auto_confirm: bool,
    pub max_files_per_run: Option<usize>,

    // Preconditions
    pub require_git_clean: bool,
    pub require_backup: bool,
    pub verify_baseline: bool,
    pub allow_red_baseline: bool,

    // Detection
    pub min_confidence: f64,
    pub fix_types: FixTypes,
    pub whitelist: WhitelistConfig,

    // Validation + commit
    pub validation: ValidationConfig,
    pub commit_after: bool,
    pub recovery_branch_prefix: String,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::from("."),
            targets: Vec::new(),
            snapshot_root: default_snapshot_root(),
            dry_run: false,
            auto_confirm: false,
            max_files_per_run: Some(DEFAULT_MAX_FILES_PER_RUN),
            require_git_clean: true,
            require_backup: true,
            verify_baseline: false,
            allow_red_baseline: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            fix_types: FixTypes::default(),
            whitelist: WhitelistConfig::default(),
            validation: ValidationConfig::default(),
            commit_after: false,
            recovery_branch_prefix: DEFAULT_RECOVERY_PREFIX.to_string(),
        }
    }
}

impl FixSettings {
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            min_confidence: self.min_confidence,
            max_files_per_run: self.max_files_per_run,
            fix_types: self.fix_types,
            whitelist: self.whitelist.clone(),
        }
    }
}

/// `<system temp>/safefix-snapshots`. Kept outside the project so backups
/// never show up as untracked files.
pub fn default_snapshot_root() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .map(|tmp| tmp.join("safefix-snapshots"))
        .unwrap_or_else(|_| Utf8PathBuf::from(".safefix-snapshots"))
}
