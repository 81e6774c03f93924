//! Edit engine for safefix change sets.
//!
//! Responsibilities:
//! - Apply line edits to in-memory content in descending line order.
//! - Compute every file rewrite before anything touches disk.
//! - Render unified diffs for previews.
//! - Back up and restore files around a transaction (`snapshot`).

mod error;
pub mod snapshot;

pub use error::EditError;
pub use snapshot::{
    BackupEntry, RestoreFailure, RestoreReport, SnapshotHandle, SnapshotInfo, SnapshotStore,
};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use fs_err as fs;
use safefix_types::change::{ChangeSet, Edit, EditOp};
use std::cmp::Reverse;
use tracing::debug;

/// One file's content before and after its edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRewrite {
    /// Project-relative path, as recorded in the change set.
    pub path: Utf8PathBuf,
    pub before: String,
    pub after: String,
    pub edits: usize,
}

impl FileRewrite {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Apply `edits` to `content`.
///
/// Edits are applied from the highest line down so earlier line numbers stay
/// valid. At the same line, removals and replacements run before inserts.
/// Every surviving line keeps its own ending (`\n` or `\r\n`), and so does
/// the presence or absence of a trailing newline. Inserted lines take the
/// ending of the line they land before.
pub fn apply_edits(content: &str, edits: &[Edit]) -> Result<String, EditError> {
    let eol = first_ending(content);
    let mut lines: Vec<Line> = content.split_inclusive('\n').map(Line::parse).collect();

    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|e| (Reverse(e.line), op_rank(e.op)));

    let mut last_rewrite: Option<usize> = None;
    for edit in ordered {
        match edit.op {
            EditOp::Remove | EditOp::Replace => {
                if last_rewrite == Some(edit.line) {
                    return Err(EditError::Overlap {
                        file: edit.file.clone(),
                        line: edit.line,
                    });
                }
                last_rewrite = Some(edit.line);

                let idx = line_index(edit, lines.len())?;
                if lines[idx].text != edit.old_text {
                    return Err(EditError::StaleText {
                        file: edit.file.clone(),
                        line: edit.line,
                        expected: edit.old_text.clone(),
                        found: lines[idx].text.clone(),
                    });
                }
                if edit.op == EditOp::Remove {
                    let removed = lines.remove(idx);
                    if removed.eol.is_empty()
                        && idx == lines.len()
                        && let Some(prev) = lines.last_mut()
                    {
                        prev.eol = "";
                    }
                } else {
                    lines[idx].text = edit.new_text.clone().unwrap_or_default();
                }
            }
            EditOp::Insert => {
                if edit.line == 0 || edit.line > lines.len() + 1 {
                    return Err(EditError::LineOutOfRange {
                        file: edit.file.clone(),
                        line: edit.line,
                        len: lines.len(),
                    });
                }
                let at = edit.line - 1;
                let text = edit.new_text.clone().unwrap_or_default();
                let line = match lines.get(at) {
                    Some(next) if !next.eol.is_empty() => Line { text, eol: next.eol },
                    Some(_) => Line { text, eol },
                    None => match lines.last_mut() {
                        Some(prev) if prev.eol.is_empty() => {
                            prev.eol = eol;
                            Line { text, eol: "" }
                        }
                        Some(prev) => Line { text, eol: prev.eol },
                        None => Line { text, eol: "" },
                    },
                };
                lines.insert(at, line);
            }
        }
    }

    Ok(lines.iter().map(|l| format!("{}{}", l.text, l.eol)).collect())
}

/// One line body and the terminator it had in the source.
struct Line {
    text: String,
    eol: &'static str,
}

impl Line {
    fn parse(raw: &str) -> Self {
        let (text, eol) = if let Some(body) = raw.strip_suffix("\r\n") {
            (body, "\r\n")
        } else if let Some(body) = raw.strip_suffix('\n') {
            (body, "\n")
        } else {
            (raw, "")
        };
        Line {
            text: text.to_string(),
            eol,
        }
    }
}

/// Ending of the first terminated line, `\n` when there is none.
fn first_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(i) if content[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

fn op_rank(op: EditOp) -> u8 {
    match op {
        EditOp::Remove | EditOp::Replace => 0,
        EditOp::Insert => 1,
    }
}

fn line_index(edit: &Edit, len: usize) -> Result<usize, EditError> {
    if edit.line == 0 || edit.line > len {
        return Err(EditError::LineOutOfRange {
            file: edit.file.clone(),
            line: edit.line,
            len,
        });
    }
    Ok(edit.line - 1)
}

/// Read every file in `changes` and compute its rewritten content.
///
/// Nothing is written. Any stale or out-of-range edit fails the whole call,
/// so a caller either has every rewrite or none.
pub fn plan_rewrites(
    project_root: &Utf8Path,
    changes: &ChangeSet,
) -> anyhow::Result<Vec<FileRewrite>> {
    let mut out = Vec::new();
    for file in &changes.files {
        if file.edits.is_empty() {
            continue;
        }
        let abs = abs_path(project_root, &file.path);
        let before = fs::read_to_string(&abs).with_context(|| format!("read {}", abs))?;
        let after = apply_edits(&before, &file.edits)?;
        debug!(file = %file.path, edits = file.edits.len(), "rewrite planned");
        out.push(FileRewrite {
            path: file.path.clone(),
            before,
            after,
            edits: file.edits.len(),
        });
    }
    Ok(out)
}

/// Unified diff for every changed file in `rewrites`.
pub fn render_patch(rewrites: &[FileRewrite]) -> String {
    let mut out = String::new();
    for r in rewrites.iter().filter(|r| r.changed()) {
        out.push_str(&render_file_diff(&r.path, &r.before, &r.after));
    }
    out
}

/// Unified diff for one file, with git-style headers.
pub fn render_file_diff(path: &Utf8Path, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    let formatter = PatchFormatter::new();
    let body = formatter.fmt_patch(&patch).to_string();
    // diffy emits its own ---/+++ pair; keep only the hunks.
    for line in body.lines().skip_while(|l| !l.starts_with("@@")) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub(crate) fn abs_path(root: &Utf8Path, rel: &Utf8Path) -> Utf8PathBuf {
    if rel.is_absolute() {
        rel.to_path_buf()
    } else {
        root.join(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use safefix_types::candidate::FixCategory;

    const CAT: FixCategory = FixCategory::ConsoleLogs;

    fn path() -> &'static Utf8Path {
        Utf8Path::new("a.js")
    }

    #[test]
    fn removes_and_replaces_in_descending_order() {
        let src = "one\ntwo\nthree\nfour\n";
        let edits = vec![
            Edit::remove(path(), 2, "two", CAT, "rm"),
            Edit::replace(path(), 4, "four", "FOUR", CAT, "rp"),
            Edit::remove(path(), 1, "one", CAT, "rm"),
        ];
        assert_eq!(apply_edits(src, &edits).unwrap(), "three\nFOUR\n");
    }

    #[test]
    fn insert_and_remove_at_same_line() {
        let src = "a\nb\nc\n";
        let edits = vec![
            Edit::insert(path(), 2, "new", CAT, "ins"),
            Edit::remove(path(), 2, "b", CAT, "rm"),
        ];
        assert_eq!(apply_edits(src, &edits).unwrap(), "a\nnew\nc\n");
    }

    #[test]
    fn insert_can_append() {
        let edits = vec![Edit::insert(path(), 3, "z", CAT, "ins")];
        assert_eq!(apply_edits("x\ny", &edits).unwrap(), "x\ny\nz");
    }

    #[test]
    fn crlf_and_missing_trailing_newline_survive() {
        let src = "a\r\nb\r\nc";
        let edits = vec![Edit::remove(path(), 2, "b", CAT, "rm")];
        assert_eq!(apply_edits(src, &edits).unwrap(), "a\r\nc");
    }

    #[test]
    fn mixed_endings_stay_per_line() {
        let src = "a\nb\r\nc\nd\r\n";
        let edits = vec![
            Edit::replace(path(), 1, "a", "A", CAT, "rp"),
            Edit::remove(path(), 3, "c", CAT, "rm"),
            Edit::insert(path(), 2, "new", CAT, "ins"),
        ];
        assert_eq!(apply_edits(src, &edits).unwrap(), "A\nnew\r\nb\r\nd\r\n");
    }

    #[test]
    fn removing_the_unterminated_last_line_drops_the_trailing_newline() {
        let edits = vec![Edit::remove(path(), 2, "b", CAT, "rm")];
        assert_eq!(apply_edits("a\r\nb", &edits).unwrap(), "a");
    }

    #[test]
    fn removing_every_line_gives_empty_content() {
        let edits = vec![Edit::remove(path(), 1, "debugger;", CAT, "rm")];
        assert_eq!(apply_edits("debugger;\n", &edits).unwrap(), "");
    }

    #[test]
    fn stale_text_is_rejected() {
        let edits = vec![Edit::remove(path(), 1, "console.log(1);", CAT, "rm")];
        let err = apply_edits("foo();\n", &edits).unwrap_err();
        assert!(matches!(err, EditError::StaleText { line: 1, .. }));
    }

    #[test]
    fn out_of_range_is_rejected() {
        let edits = vec![Edit::remove(path(), 5, "x", CAT, "rm")];
        assert!(matches!(
            apply_edits("x\n", &edits).unwrap_err(),
            EditError::LineOutOfRange { line: 5, len: 1, .. }
        ));
    }

    #[test]
    fn two_rewrites_of_one_line_overlap() {
        let edits = vec![
            Edit::remove(path(), 1, "x", CAT, "rm"),
            Edit::replace(path(), 1, "x", "y", CAT, "rp"),
        ];
        assert!(matches!(
            apply_edits("x\n", &edits).unwrap_err(),
            EditError::Overlap { line: 1, .. }
        ));
    }

    #[test]
    fn file_diff_has_git_headers_and_hunks() {
        let diff = render_file_diff(
            Utf8Path::new("src/a.js"),
            "keep();\nconsole.log(1);\n",
            "keep();\n",
        );
        assert!(diff.starts_with(
            "diff --git a/src/a.js b/src/a.js\n--- a/src/a.js\n+++ b/src/a.js\n"
        ));
        assert!(diff.contains("@@"));
        assert!(diff.contains("-console.log(1);"));
        assert_eq!(diff.matches("+++").count(), 1);
    }

    #[test]
    fn unchanged_files_render_nothing() {
        assert_eq!(render_file_diff(Utf8Path::new("a.js"), "x\n", "x\n"), "");
    }
}
