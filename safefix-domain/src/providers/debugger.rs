use super::{
    FixProvider, NESTED_CONFIDENCE, Prefix, ProviderMeta, SourceFile, classify_match,
    node_position,
};
use crate::scan::{BARE_BODY_PARENTS, in_comment_or_string, node_text, walk_named};
use regex::Regex;
use safefix_types::candidate::{CandidateSite, DetectionSource, FixCandidate, FixCategory};
use std::sync::LazyLock;
use tree_sitter::Tree;

const DEBUGGER_CONFIDENCE: f64 = 1.0;

static DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdebugger\b[ \t]*;?").expect("debugger regex"));

pub(crate) struct DebuggerProvider;

impl FixProvider for DebuggerProvider {
    fn meta(&self) -> ProviderMeta {
        ProviderMeta {
            key: "debugger_statements",
            category: FixCategory::DebuggerStatements,
            title: "Remove debugger statements",
            description: "Removes `debugger` statements.",
        }
    }

    fn find_candidates(&self, file: &SourceFile<'_>) -> Vec<FixCandidate> {
        match file.tree {
            Some(tree) => from_tree(file, tree),
            None => from_text(file),
        }
    }
}

fn from_tree(file: &SourceFile<'_>, tree: &Tree) -> Vec<FixCandidate> {
    let mut out = Vec::new();
    walk_named(tree.root_node(), |node| {
        if node.kind() != "debugger_statement" {
            return;
        }
        let bare = node
            .parent()
            .is_some_and(|p| BARE_BODY_PARENTS.contains(&p.kind()));
        let (line, column, end_line) = node_position(node);
        out.push(FixCandidate {
            file: file.path.to_path_buf(),
            line,
            column,
            end_line: Some(end_line),
            category: FixCategory::DebuggerStatements,
            matched_text: node_text(node, file.text).to_string(),
            confidence: if bare { NESTED_CONFIDENCE } else { DEBUGGER_CONFIDENCE },
            source: DetectionSource::Ast,
            site: if bare { CandidateSite::ControlBody } else { CandidateSite::Statement },
        });
    });
    out
}

fn from_text(file: &SourceFile<'_>) -> Vec<FixCandidate> {
    let lines = file.lines();
    let mut out = Vec::new();
    for (idx, line) in lines.iter().copied().enumerate() {
        for m in DEBUGGER.find_iter(line) {
            if in_comment_or_string(line, m.start()) {
                continue;
            }
            let (confidence, site) = match classify_match(&lines, idx, m.start()) {
                Prefix::Boundary => (DEBUGGER_CONFIDENCE, CandidateSite::Statement),
                Prefix::BareBody => (NESTED_CONFIDENCE, CandidateSite::ControlBody),
                Prefix::Expression | Prefix::Value => continue,
            };
            out.push(FixCandidate {
                file: file.path.to_path_buf(),
                line: idx + 1,
                column: m.start() + 1,
                end_line: Some(idx + 1),
                category: FixCategory::DebuggerStatements,
                matched_text: m.as_str().trim_end().to_string(),
                confidence,
                source: DetectionSource::Regex,
                site,
            });
        }
    }
    out
}
