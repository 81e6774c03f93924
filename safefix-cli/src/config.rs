//! Configuration file loading for safefix.
//!
//! Discovers and loads `safefix.toml` from the project root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use safefix_core::FixSettings;
use safefix_core::settings::{
    DEFAULT_MAX_FILES_PER_RUN, DEFAULT_RECOVERY_PREFIX, default_snapshot_root,
};
use safefix_types::candidate::FixCategory;
use safefix_types::config::{CustomCommand, FixTypes, ValidationConfig, WhitelistConfig};
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "safefix.toml";

pub const DEFAULT_SNAPSHOT_MAX_AGE_HOURS: u64 = 24 * 7;

/// Top-level configuration from safefix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SafefixConfig {
    /// Transaction behaviour and enabled categories.
    pub fix: FixConfig,

    /// Post-apply checks.
    pub validation: ValidationConfig,

    /// Files, patterns and markers that are never touched.
    pub whitelist: WhitelistConfig,

    /// Backup location and retention.
    pub snapshots: SnapshotsConfig,
}

/// `[fix]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FixConfig {
    pub dry_run: bool,

    /// Accept every change without prompting.
    pub auto_confirm: bool,

    /// Maximum files with edits per run. `0` means unlimited.
    pub max_files_per_run: usize,

    pub require_git_clean: bool,
    pub require_backup: bool,
    pub min_confidence: f64,

    /// Run the validation suite before touching anything.
    pub verify_baseline: bool,

    /// Continue when the baseline validation fails.
    pub allow_red_baseline: bool,

    /// Commit the fix without asking.
    pub commit_after: bool,

    pub recovery_branch_prefix: String,

    /// `[fix.types]`
    pub types: FixTypes,
}

impl Default for FixConfig {
    fn default() -> Self {
        let defaults = FixSettings::default();
        Self {
            dry_run: defaults.dry_run,
            auto_confirm: defaults.auto_confirm,
            max_files_per_run: DEFAULT_MAX_FILES_PER_RUN,
            require_git_clean: defaults.require_git_clean,
            require_backup: defaults.require_backup,
            min_confidence: defaults.min_confidence,
            verify_baseline: defaults.verify_baseline,
            allow_red_baseline: defaults.allow_red_baseline,
            commit_after: defaults.commit_after,
            recovery_branch_prefix: DEFAULT_RECOVERY_PREFIX.to_string(),
            types: FixTypes::default(),
        }
    }
}

/// `[snapshots]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotsConfig {
    /// Snapshot directory. Relative paths resolve against the project root.
    pub root: Option<Utf8PathBuf>,

    /// Age after which `safefix snapshots gc` removes a snapshot.
    pub max_age_hours: u64,
}

impl Default for SnapshotsConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_age_hours: DEFAULT_SNAPSHOT_MAX_AGE_HOURS,
        }
    }
}

impl SafefixConfig {
    /// Snapshot root from config, or the system default.
    pub fn snapshot_root(&self, project_root: &Utf8Path) -> Utf8PathBuf {
        match &self.snapshots.root {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => project_root.join(p),
            None => default_snapshot_root(),
        }
    }
}

/// Discover the safefix.toml config file.
///
/// Searches for `safefix.toml` in the project root directory.
/// Returns `None` if no config file is found.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a safefix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<SafefixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<SafefixConfig> {
    let config: SafefixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<SafefixConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(SafefixConfig::default()),
    }
}

/// Overrides collected from `safefix fix` flags.
///
/// Boolean flags only ever turn a behaviour on (or, for the `no_`/`allow_`
/// flags, turn a safety requirement off); unset options keep the file value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dry_run: bool,
    pub yes: bool,
    pub allow_dirty: bool,
    pub no_backup: bool,
    pub commit: bool,
    pub verify_baseline: bool,
    pub allow_red_baseline: bool,
    pub no_validate: bool,
    pub max_files: Option<usize>,
    pub min_confidence: Option<f64>,
    pub only: Option<FixCategory>,
    pub timeout_secs: Option<u64>,
    pub snapshot_root: Option<Utf8PathBuf>,
    pub checks: Vec<CustomCommand>,
    pub whitelist: WhitelistConfig,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: SafefixConfig,
}

impl ConfigMerger {
    pub fn new(config: SafefixConfig) -> Self {
        Self { config }
    }

    /// Resolve the settings for one `safefix fix` run.
    ///
    /// CLI whitelist entries and `--check` commands extend the config file
    /// lists; every other CLI value replaces the file value when given.
    pub fn merge_fix_args(
        self,
        project_root: &Utf8Path,
        targets: &[Utf8PathBuf],
        cli: &CliOverrides,
    ) -> anyhow::Result<FixSettings> {
        let fix = &self.config.fix;

        let min_confidence = cli.min_confidence.unwrap_or(fix.min_confidence);
        if !(0.0..=1.0).contains(&min_confidence) {
            anyhow::bail!("min_confidence must be between 0 and 1, got {min_confidence}");
        }

        let mut whitelist = self.config.whitelist.clone();
        whitelist.extend(&cli.whitelist);

        let mut validation = if cli.no_validate {
            ValidationConfig::disabled()
        } else {
            self.config.validation.clone()
        };
        for check in &cli.checks {
            if !validation.custom_commands.contains(check) {
                validation.custom_commands.push(check.clone());
            }
        }
        if let Some(secs) = cli.timeout_secs {
            validation.timeout_secs = secs;
        }

        let max_files = cli.max_files.unwrap_or(fix.max_files_per_run);
        let snapshot_root = match &cli.snapshot_root {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => project_root.join(p),
            None => self.config.snapshot_root(project_root),
        };

        let settings = FixSettings {
            project_root: project_root.to_path_buf(),
            targets: targets.to_vec(),
            snapshot_root,
            dry_run: cli.dry_run || fix.dry_run,
            auto_confirm: cli.yes || fix.auto_confirm,
            max_files_per_run: (max_files > 0).then_some(max_files),
            require_git_clean: fix.require_git_clean && !cli.allow_dirty,
            require_backup: fix.require_backup && !cli.no_backup,
            verify_baseline: cli.verify_baseline || fix.verify_baseline,
            allow_red_baseline: cli.allow_red_baseline || fix.allow_red_baseline,
            min_confidence,
            fix_types: cli.only.map(FixTypes::only).unwrap_or(fix.types),
            whitelist,
            validation,
            commit_after: cli.commit || fix.commit_after,
            recovery_branch_prefix: fix.recovery_branch_prefix.clone(),
        };
        debug!(?settings, "merged settings");
        Ok(settings)
    }
}

/// Parse a `name=command` check definition.
pub fn parse_check(entry: &str) -> anyhow::Result<CustomCommand> {
    let (name, command) = entry
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid check '{}': expected name=command", entry))?;
    let name = name.trim();
    let command = command.trim();
    if name.is_empty() {
        anyhow::bail!("invalid check '{}': missing name", entry);
    }
    if command.is_empty() {
        anyhow::bail!("invalid check '{}': missing command", entry);
    }
    Ok(CustomCommand {
        name: name.to_string(),
        command: command.to_string(),
    })
}
