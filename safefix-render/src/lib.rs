//! Rendering helpers for human-readable output.
//!
//! Plain text goes to the terminal; markdown variants are for reports that
//! get pasted into PRs or CI summaries.

use camino::Utf8Path;
use safefix_types::candidate::FixCategory;
use safefix_types::change::{ChangeSet, ChangeSummary, EditOp, FileChanges};
use safefix_types::outcome::TransactionResult;
use safefix_types::validation::{CheckOutcome, CheckStatus, ValidationOutcome};

/// Lines of captured check output shown per failed check.
const OUTPUT_TAIL_LINES: usize = 20;

pub fn render_summary(summary: &ChangeSummary) -> String {
    let mut out = format!(
        "Found {} {} in {} {}\n",
        summary.total_edits,
        plural(summary.total_edits, "fix", "fixes"),
        summary.files,
        plural(summary.files, "file", "files"),
    );
    for (category, counts) in &summary.per_category {
        out.push_str(&format!(
            "  {}: {} in {} {}\n",
            category.label(),
            counts.edits,
            counts.files,
            plural(counts.files, "file", "files"),
        ));
    }
    out
}

/// Header line for one file in a preview.
pub fn render_file_header(path: &Utf8Path, edits: usize) -> String {
    format!(
        "== {} ({} {})\n",
        path,
        edits,
        plural(edits as u64, "edit", "edits")
    )
}

/// One line per edit, grouped by file.
pub fn render_change_set(changes: &ChangeSet) -> String {
    let mut out = String::new();
    for file in changes.files.iter().filter(|f| !f.edits.is_empty()) {
        out.push_str(&render_file_header(&file.path, file.edits.len()));
        out.push_str(&render_edit_list(file));
    }
    out
}

/// Numbered edits of one file, as offered when curating individual edits.
pub fn render_edit_list(file: &FileChanges) -> String {
    let mut out = String::new();
    for (i, e) in file.edits.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. L{:<5} {:<7} {}\n",
            i + 1,
            e.line,
            op_label(e.op),
            e.description
        ));
    }
    out
}

pub fn render_validation(outcome: &ValidationOutcome) -> String {
    let mut out = String::new();
    for check in &outcome.checks {
        out.push_str(&render_check(check));
    }
    out
}

fn render_check(check: &CheckOutcome) -> String {
    let tag = match check.status {
        CheckStatus::Passed => "pass",
        CheckStatus::Failed => "FAIL",
        CheckStatus::Skipped => "skip",
    };
    let mut out = format!("  [{tag}] {}", check.name);
    if let Some(cmd) = &check.command {
        out.push_str(&format!(" ({cmd})"));
    }
    match check.status {
        CheckStatus::Skipped => {
            if !check.output.is_empty() {
                out.push_str(&format!(": {}", check.output));
            }
            out.push('\n');
        }
        CheckStatus::Passed => out.push_str(&format!(" {}ms\n", check.duration_ms)),
        CheckStatus::Failed => {
            if check.timed_out {
                out.push_str(" timed out");
            } else if let Some(code) = check.exit_code {
                out.push_str(&format!(" exit {code}"));
            }
            out.push('\n');
            let lines: Vec<&str> = check.output.lines().collect();
            let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
            for line in &lines[start..] {
                out.push_str(&format!("      {line}\n"));
            }
        }
    }
    out
}

/// Terminal report for a finished transaction.
pub fn render_result_text(result: &TransactionResult) -> String {
    let mut out = String::new();
    let status = if result.success { "success" } else { "failed" };
    out.push_str(&format!(
        "safefix: {status} (last phase: {})\n",
        result.phase.label()
    ));

    if result.dry_run {
        let (edits, files) = result
            .summary
            .as_ref()
            .map(|s| (s.total_edits, s.files))
            .unwrap_or((0, 0));
        out.push_str(&format!(
            "  dry run: would apply {edits} {} to {files} {}\n",
            plural(edits, "change", "changes"),
            plural(files, "file", "files"),
        ));
    } else {
        out.push_str(&format!("  files modified: {}\n", result.files_modified));
        out.push_str(&format!("  changes applied: {}\n", result.changes_applied));
    }
    if let Some(id) = &result.backup_id {
        out.push_str(&format!("  backup: {id}\n"));
    }
    if let Some(branch) = &result.recovery_branch {
        out.push_str(&format!("  recovery branch: {branch}\n"));
    }
    if let Some(sha) = &result.commit {
        out.push_str(&format!("  commit: {sha}\n"));
    }
    if let Some(v) = &result.validation {
        out.push_str("validation:\n");
        out.push_str(&render_validation(v));
    }
    if result.rolled_back {
        out.push_str("rolled back: yes\n");
    }
    if !result.restore_failures.is_empty() {
        out.push_str("restore failures:\n");
        for f in &result.restore_failures {
            out.push_str(&format!("  - {f}\n"));
        }
    }
    if !result.errors.is_empty() {
        out.push_str("errors:\n");
        for e in &result.errors {
            out.push_str(&format!("  - {e}\n"));
        }
    }
    out
}

pub fn render_result_md(result: &TransactionResult) -> String {
    let mut out = String::new();
    out.push_str("# safefix result\n\n");
    out.push_str(&format!("- Success: `{}`\n", result.success));
    out.push_str(&format!("- Last phase: `{}`\n", result.phase.label()));
    out.push_str(&format!("- Dry run: `{}`\n", result.dry_run));
    out.push_str(&format!("- Files modified: {}\n", result.files_modified));
    out.push_str(&format!("- Changes applied: {}\n", result.changes_applied));
    out.push_str(&format!("- Rolled back: `{}`\n", result.rolled_back));
    if let Some(branch) = &result.recovery_branch {
        out.push_str(&format!("- Recovery branch: `{branch}`\n"));
    }
    out.push('\n');

    if let Some(summary) = &result.summary {
        out.push_str("## Changes\n\n");
        out.push_str("| Category | Edits | Files |\n|---|---:|---:|\n");
        for (category, counts) in &summary.per_category {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                category.label(),
                counts.edits,
                counts.files
            ));
        }
        out.push('\n');
    }

    if let Some(v) = &result.validation {
        out.push_str("## Validation\n\n");
        if v.checks.is_empty() {
            out.push_str("_No checks configured._\n\n");
        }
        for c in &v.checks {
            let status = match c.status {
                CheckStatus::Passed => "passed",
                CheckStatus::Failed => "failed",
                CheckStatus::Skipped => "skipped",
            };
            out.push_str(&format!("- `{}`: {status}\n", c.name));
        }
        out.push('\n');
    }

    if !result.errors.is_empty() {
        out.push_str("## Errors\n\n");
        for e in &result.errors {
            out.push_str(&format!("- {e}\n"));
        }
    }
    out
}

/// Commit message for a successful run.
///
/// ```text
/// chore(safefix): remove 3 debug statements
///
/// - console.log statements: 2 removed in 2 files
/// - debugger statements: 1 removed in 1 file
/// ```
pub fn render_commit_message(summary: &ChangeSummary) -> String {
    let mut out = format!(
        "chore(safefix): remove {} debug {}\n\n",
        summary.total_edits,
        plural(summary.total_edits, "statement", "statements")
    );
    for category in FixCategory::ALL {
        if let Some(counts) = summary.per_category.get(&category) {
            out.push_str(&format!(
                "- {}: {} removed in {} {}\n",
                category.label(),
                counts.edits,
                counts.files,
                plural(counts.files, "file", "files")
            ));
        }
    }
    out
}

fn op_label(op: EditOp) -> &'static str {
    match op {
        EditOp::Remove => "remove",
        EditOp::Replace => "replace",
        EditOp::Insert => "insert",
    }
}

fn plural<'a>(n: u64, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_picks_form() {
        assert_eq!(plural(1, "file", "files"), "file");
        assert_eq!(plural(0, "file", "files"), "files");
        assert_eq!(plural(2, "fix", "fixes"), "fixes");
    }
}
