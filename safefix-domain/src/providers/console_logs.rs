use super::{
    FixProvider, LITERAL_CONFIDENCE, NESTED_CONFIDENCE, Prefix, ProviderMeta,
    SIDE_EFFECT_CONFIDENCE, STATEMENT_CONFIDENCE, SourceFile, classify_match, node_position,
};
use crate::builder::MAX_SPAN_LINES;
use crate::scan::{
    BARE_BODY_PARENTS, args_are_literals, has_side_effect_text, in_comment_or_string,
    matching_paren, node_text, walk_named,
};
use regex::Regex;
use safefix_types::candidate::{CandidateSite, DetectionSource, FixCandidate, FixCategory};
use std::sync::LazyLock;
use tree_sitter::{Node, Tree};

/// Console methods that only produce diagnostic output. `warn` and `error`
/// are deliberately absent.
const METHODS: &[&str] = &[
    "log",
    "debug",
    "info",
    "trace",
    "dir",
    "table",
    "time",
    "timeEnd",
    "group",
    "groupEnd",
];

static CONSOLE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bconsole\s*\.\s*(log|debug|info|trace|dir|table|timeEnd|time|groupEnd|group)\s*\(",
    )
    .expect("console call regex")
});

/// Expression kinds a console call may be nested in while still sitting in an
/// expression statement.
const NESTING_KINDS: &[&str] = &[
    "sequence_expression",
    "ternary_expression",
    "binary_expression",
    "parenthesized_expression",
];

const SIDE_EFFECT_KINDS: &[&str] = &[
    "call_expression",
    "update_expression",
    "assignment_expression",
    "augmented_assignment_expression",
    "await_expression",
    "new_expression",
    "yield_expression",
];

pub(crate) struct ConsoleLogProvider;

impl FixProvider for ConsoleLogProvider {
    fn meta(&self) -> ProviderMeta {
        ProviderMeta {
            key: "console_logs",
            category: FixCategory::ConsoleLogs,
            title: "Remove console.log statements",
            description: "Removes console.log/debug/info/trace/dir/table/time/group calls \
                          used as statements.",
        }
    }

    fn find_candidates(&self, file: &SourceFile<'_>) -> Vec<FixCandidate> {
        match file.tree {
            Some(tree) => from_tree(file, tree),
            None => from_text(file),
        }
    }
}

enum CallSite<'t> {
    /// The call is the whole expression statement.
    Statement(Node<'t>),
    /// The call is part of a larger expression statement.
    Nested,
}

fn from_tree(file: &SourceFile<'_>, tree: &Tree) -> Vec<FixCandidate> {
    let mut out = Vec::new();
    walk_named(tree.root_node(), |node| {
        if node.kind() != "call_expression" || !is_console_call(node, file.text) {
            return;
        }
        let Some(site) = call_site(node) else {
            return;
        };

        let (span, confidence, site) = match site {
            CallSite::Statement(stmt) => {
                let bare = stmt
                    .parent()
                    .is_some_and(|p| BARE_BODY_PARENTS.contains(&p.kind()));
                if bare {
                    (stmt, NESTED_CONFIDENCE, CandidateSite::ControlBody)
                } else {
                    let confidence = argument_confidence(node, file.text);
                    (stmt, confidence, CandidateSite::Statement)
                }
            }
            CallSite::Nested => (node, NESTED_CONFIDENCE, CandidateSite::Expression),
        };

        let (line, column, end_line) = node_position(span);
        out.push(FixCandidate {
            file: file.path.to_path_buf(),
            line,
            column,
            end_line: Some(end_line),
            category: FixCategory::ConsoleLogs,
            matched_text: node_text(span, file.text).to_string(),
            confidence,
            source: DetectionSource::Ast,
            site,
        });
    });
    out
}

fn is_console_call(call: Node<'_>, source: &str) -> bool {
    let Some(callee) = call.child_by_field_name("function") else {
        return false;
    };
    if callee.kind() != "member_expression" {
        return false;
    }
    let object = callee.child_by_field_name("object");
    let property = callee.child_by_field_name("property");
    match (object, property) {
        (Some(o), Some(p)) => {
            o.kind() == "identifier"
                && node_text(o, source) == "console"
                && METHODS.contains(&node_text(p, source))
        }
        _ => false,
    }
}

fn call_site(call: Node<'_>) -> Option<CallSite<'_>> {
    let mut current = call;
    let mut nested = false;
    loop {
        let parent = current.parent()?;
        match parent.kind() {
            "expression_statement" => {
                return Some(if nested {
                    CallSite::Nested
                } else {
                    CallSite::Statement(parent)
                });
            }
            k if NESTING_KINDS.contains(&k) => {
                nested = true;
                current = parent;
            }
            _ => return None,
        }
    }
}

fn argument_confidence(call: Node<'_>, source: &str) -> f64 {
    let Some(args) = call.child_by_field_name("arguments") else {
        return STATEMENT_CONFIDENCE;
    };

    let mut side_effects = false;
    walk_named(args, |n| {
        if SIDE_EFFECT_KINDS.contains(&n.kind()) {
            side_effects = true;
        }
    });
    if side_effects {
        return SIDE_EFFECT_CONFIDENCE;
    }

    let mut cursor = args.walk();
    let all_literal = args
        .named_children(&mut cursor)
        .filter(|a| a.kind() != "comment")
        .all(|a| is_literal_node(a, source));
    if all_literal {
        LITERAL_CONFIDENCE
    } else {
        STATEMENT_CONFIDENCE
    }
}

fn is_literal_node(node: Node<'_>, source: &str) -> bool {
    match node.kind() {
        "string" | "number" | "true" | "false" | "null" | "undefined" => true,
        "template_string" => {
            let mut cursor = node.walk();
            let has_substitution = node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            !has_substitution
        }
        "identifier" => node_text(node, source) == "undefined",
        _ => false,
    }
}

fn from_text(file: &SourceFile<'_>) -> Vec<FixCandidate> {
    let lines = file.lines();
    let mut out = Vec::new();
    for (idx, line) in lines.iter().copied().enumerate() {
        for m in CONSOLE_CALL.find_iter(line) {
            if in_comment_or_string(line, m.start()) {
                continue;
            }
            let prefix = classify_match(&lines, idx, m.start());
            let site = match prefix {
                Prefix::Boundary => CandidateSite::Statement,
                Prefix::BareBody => CandidateSite::ControlBody,
                Prefix::Expression => CandidateSite::Expression,
                Prefix::Value => continue,
            };

            let open = m.end() - 1;
            let candidate = match matching_paren(line, open) {
                Some(close) => {
                    let args = &line[open + 1..close - 1];
                    let (end, confidence) = match site {
                        CandidateSite::Statement => {
                            (include_semicolon(line, close), text_confidence(args))
                        }
                        CandidateSite::ControlBody => {
                            (include_semicolon(line, close), NESTED_CONFIDENCE)
                        }
                        CandidateSite::Expression => (close, NESTED_CONFIDENCE),
                    };
                    FixCandidate {
                        file: file.path.to_path_buf(),
                        line: idx + 1,
                        column: m.start() + 1,
                        end_line: Some(idx + 1),
                        category: FixCategory::ConsoleLogs,
                        matched_text: line[m.start()..end].to_string(),
                        confidence,
                        source: DetectionSource::Regex,
                        site,
                    }
                }
                // Call continues on later lines; the builder finds the end.
                None if site.is_statement() => FixCandidate {
                    file: file.path.to_path_buf(),
                    line: idx + 1,
                    column: m.start() + 1,
                    end_line: None,
                    category: FixCategory::ConsoleLogs,
                    matched_text: line[m.start()..].trim_end().to_string(),
                    confidence: text_confidence(&spanning_args(&lines, idx, open)),
                    source: DetectionSource::Regex,
                    site,
                },
                None => continue,
            };
            out.push(candidate);
        }
    }
    out
}

/// Argument text of a call opened at `open` on line `idx` and closed on a
/// later line. Without a close within reach, everything after `(` counts.
fn spanning_args(lines: &[&str], idx: usize, open: usize) -> String {
    let last = (idx + MAX_SPAN_LINES).min(lines.len().saturating_sub(1));
    let joined = lines[idx..=last].join("\n");
    match matching_paren(&joined, open) {
        Some(close) => joined[open + 1..close - 1].to_string(),
        None => joined[open + 1..].to_string(),
    }
}

/// Extend `end` over a directly following `;`.
fn include_semicolon(line: &str, end: usize) -> usize {
    let rest = &line[end..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with(';') {
        end + (rest.len() - trimmed.len()) + 1
    } else {
        end
    }
}

fn text_confidence(args: &str) -> f64 {
    if has_side_effect_text(args) {
        SIDE_EFFECT_CONFIDENCE
    } else if args_are_literals(args) {
        LITERAL_CONFIDENCE
    } else {
        STATEMENT_CONFIDENCE
    }
}
