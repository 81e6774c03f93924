mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use fs_err as fs;
use safefix_core::adapters::{
    AlwaysAccept, FsWritePort, ShellCommandRunner, ShellGitPort, TerminalDecisions,
};
use safefix_core::ports::DecisionProvider;
use safefix_core::vcs::VcsGuard;
use safefix_core::{SnapshotStore, TransactionCoordinator, builtin_provider_metas};
use safefix_render::{render_result_md, render_result_text, render_summary};
use safefix_types::candidate::FixCategory;
use safefix_types::config::WhitelistConfig;
use std::io;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "safefix",
    version,
    about = "Remove leftover debug statements with preview, backup, validation and rollback."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect, preview, apply and validate fixes as one transaction.
    Fix(FixArgs),
    /// Hard-reset the working tree to a recovery branch created by an earlier run.
    Restore(RestoreArgs),
    /// Inspect or prune backup snapshots left by earlier runs.
    #[command(subcommand)]
    Snapshots(SnapshotsCommand),
    /// List every available fix category.
    ListFixes(ListFixesArgs),
}

#[derive(Debug, Parser)]
struct FixArgs {
    /// Files or directories to scan (default: the whole project).
    paths: Vec<Utf8PathBuf>,

    /// Project root (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Show what would change without writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Accept every change without prompting.
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,

    /// Run even when the git working tree has uncommitted changes.
    #[arg(long, default_value_t = false)]
    allow_dirty: bool,

    /// Skip backups. A failed validation then cannot be rolled back.
    #[arg(long, default_value_t = false)]
    no_backup: bool,

    /// Commit the fix after validation passes.
    #[arg(long, default_value_t = false)]
    commit: bool,

    /// Run the validation suite before touching anything.
    #[arg(long, default_value_t = false)]
    verify_baseline: bool,

    /// Continue when the baseline validation fails.
    #[arg(long, default_value_t = false)]
    allow_red_baseline: bool,

    /// Disable configured validation checks (`--check` still runs).
    #[arg(long, default_value_t = false)]
    no_validate: bool,

    /// Extra validation check as name=command. Repeatable.
    #[arg(long = "check", value_name = "NAME=COMMAND")]
    checks: Vec<String>,

    /// Per-check timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum files with edits per run (0 = unlimited).
    #[arg(long)]
    max_files: Option<usize>,

    /// Minimum candidate confidence (0..=1).
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Only fix this category (console_logs, debugger_statements).
    #[arg(long, value_parser = parse_category)]
    only: Option<FixCategory>,

    /// Directory for backup snapshots.
    #[arg(long)]
    snapshot_root: Option<Utf8PathBuf>,

    /// Glob of files never to touch. Repeatable.
    #[arg(long = "whitelist-file", value_name = "GLOB")]
    whitelist_files: Vec<String>,

    /// Regex of lines never to touch. Repeatable.
    #[arg(long = "whitelist-pattern", value_name = "REGEX")]
    whitelist_patterns: Vec<String>,

    /// Comment marker that preserves its line and the next. Repeatable.
    #[arg(long = "keep-marker", value_name = "MARKER")]
    keep_markers: Vec<String>,

    /// Print the result record as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Also write a markdown report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct RestoreArgs {
    /// Recovery branch name, as printed by `safefix fix`.
    branch: String,

    /// Project root (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,
}

#[derive(Debug, Subcommand)]
enum SnapshotsCommand {
    /// List snapshots, oldest first.
    List(SnapshotArgs),
    /// Remove snapshots older than the configured age.
    Gc(GcArgs),
}

#[derive(Debug, Parser)]
struct SnapshotArgs {
    /// Project root (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Snapshot directory (default: from safefix.toml, else the system temp dir).
    #[arg(long)]
    snapshot_root: Option<Utf8PathBuf>,

    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Parser)]
struct GcArgs {
    #[command(flatten)]
    common: SnapshotArgs,

    /// Remove snapshots older than this many hours.
    #[arg(long)]
    max_age_hours: Option<u64>,
}

#[derive(Debug, Parser)]
struct ListFixesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_category(s: &str) -> Result<FixCategory, String> {
    FixCategory::from_key(s).ok_or_else(|| {
        let keys: Vec<&str> = FixCategory::ALL.iter().map(|c| c.key()).collect();
        format!("unknown category '{s}' (expected one of: {})", keys.join(", "))
    })
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(e) => {
            error!("{:?}", e);
            eprintln!("safefix: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Fix(args) => cmd_fix(args),
        Command::Restore(args) => cmd_restore(args),
        Command::Snapshots(SnapshotsCommand::List(args)) => cmd_snapshots_list(args),
        Command::Snapshots(SnapshotsCommand::Gc(args)) => cmd_snapshots_gc(args),
        Command::ListFixes(args) => cmd_list_fixes(args),
    }
}

fn cmd_fix(args: FixArgs) -> anyhow::Result<ExitCode> {
    let project_root = args.project_root.clone();
    let file_config = config::load_or_default(&project_root).context("load safefix.toml config")?;

    let checks = args
        .checks
        .iter()
        .map(|c| config::parse_check(c))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let overrides = CliOverrides {
        dry_run: args.dry_run,
        yes: args.yes,
        allow_dirty: args.allow_dirty,
        no_backup: args.no_backup,
        commit: args.commit,
        verify_baseline: args.verify_baseline,
        allow_red_baseline: args.allow_red_baseline,
        no_validate: args.no_validate,
        max_files: args.max_files,
        min_confidence: args.min_confidence,
        only: args.only,
        timeout_secs: args.timeout_secs,
        snapshot_root: args.snapshot_root.clone(),
        checks,
        whitelist: WhitelistConfig {
            files: args.whitelist_files.clone(),
            patterns: args.whitelist_patterns.clone(),
            comments: args.keep_markers.clone(),
        },
    };
    let settings =
        ConfigMerger::new(file_config).merge_fix_args(&project_root, &args.paths, &overrides)?;

    let mut decisions: Box<dyn DecisionProvider> = if settings.auto_confirm {
        Box::new(AlwaysAccept)
    } else if args.json {
        // Keep stdout clean for the JSON record.
        Box::new(TerminalDecisions::new(io::stdin().lock(), io::stderr()))
    } else {
        Box::new(TerminalDecisions::stdio())
    };
    let dry_run = settings.dry_run;

    let vcs = ShellGitPort;
    let runner = ShellCommandRunner;
    let writer = FsWritePort;
    let report =
        TransactionCoordinator::new(settings, &vcs, &runner, &writer, decisions.as_mut())
            .run_detailed();
    let result = &report.result;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("serialize result")?
        );
    } else {
        if dry_run {
            if let (Some(summary), Some(preview)) = (&result.summary, &report.preview) {
                print!("{}\n{preview}", render_summary(summary));
            }
        }
        print!("{}", render_result_text(result));
    }

    if let Some(path) = &args.report {
        fs::write(path, render_result_md(result)).with_context(|| format!("write {}", path))?;
        debug!(report = %path, "markdown report written");
    }

    Ok(ExitCode::from(result.exit_code()))
}

fn cmd_restore(args: RestoreArgs) -> anyhow::Result<ExitCode> {
    let vcs = ShellGitPort;
    let guard = VcsGuard::new(&vcs, &args.project_root, "safefix");
    guard.restore_from_recovery_point(&args.branch)?;
    println!("working tree reset to {}", args.branch);
    Ok(ExitCode::SUCCESS)
}

fn snapshot_store(args: &SnapshotArgs) -> anyhow::Result<(SnapshotStore, config::SafefixConfig)> {
    let file_config =
        config::load_or_default(&args.project_root).context("load safefix.toml config")?;
    let root = match &args.snapshot_root {
        Some(p) => p.clone(),
        None => file_config.snapshot_root(&args.project_root),
    };
    Ok((SnapshotStore::new(root, args.project_root.clone()), file_config))
}

fn cmd_snapshots_list(args: SnapshotArgs) -> anyhow::Result<ExitCode> {
    let (store, _) = snapshot_store(&args)?;
    let snapshots = store.list()?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshots).context("serialize snapshots")?
        );
        return Ok(ExitCode::SUCCESS);
    }
    if snapshots.is_empty() {
        println!("no snapshots in {}", store.root());
    }
    for s in &snapshots {
        let created = s
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}  {}  {} file(s)", s.id, created, s.files);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_snapshots_gc(args: GcArgs) -> anyhow::Result<ExitCode> {
    let (store, file_config) = snapshot_store(&args.common)?;
    let max_age = args
        .max_age_hours
        .unwrap_or(file_config.snapshots.max_age_hours);
    let removed = store.gc(max_age)?;
    if args.common.json {
        println!("{}", serde_json::to_string_pretty(&removed).context("serialize ids")?);
    } else {
        println!("removed {} snapshot(s) older than {max_age}h", removed.len());
        for id in &removed {
            println!("  {id}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_list_fixes(args: ListFixesArgs) -> anyhow::Result<ExitCode> {
    let metas = builtin_provider_metas();
    match args.format {
        OutputFormat::Text => {
            println!("{:<22} TITLE", "KEY");
            for m in &metas {
                println!("{:<22} {}", m.key, m.title);
                println!("{:<22} {}", "", m.description);
            }
        }
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = metas
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "key": m.key,
                        "category": m.category,
                        "title": m.title,
                        "description": m.description,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&items).context("serialize fixes")?
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
