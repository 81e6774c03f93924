use camino::Utf8Path;
use safefix_types::candidate::{FixCandidate, FixCategory};
use tree_sitter::Tree;

mod console_logs;
mod debugger;

pub(crate) use console_logs::ConsoleLogProvider;
pub(crate) use debugger::DebuggerProvider;

/// Bare statement call with ordinary arguments.
pub(crate) const STATEMENT_CONFIDENCE: f64 = 0.95;
/// Bare statement call whose arguments are all literals.
pub(crate) const LITERAL_CONFIDENCE: f64 = 0.99;
/// Arguments that call, assign or mutate; removing them drops side effects.
pub(crate) const SIDE_EFFECT_CONFIDENCE: f64 = 0.8;
/// Call inside a sequence/conditional expression, or an unbraced
/// control-flow body.
pub(crate) const NESTED_CONFIDENCE: f64 = 0.6;

/// One file's content as seen by a provider.
#[derive(Clone, Copy)]
pub struct SourceFile<'a> {
    pub path: &'a Utf8Path,
    pub text: &'a str,
    /// `None` when parsing failed or produced error nodes.
    pub tree: Option<&'a Tree>,
}

impl<'a> SourceFile<'a> {
    pub fn lines(&self) -> Vec<&'a str> {
        self.text.lines().collect()
    }
}

/// Static description of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderMeta {
    pub key: &'static str,
    pub category: FixCategory,
    pub title: &'static str,
    pub description: &'static str,
}

/// One fix category and how to find it.
///
/// Turning candidates into edits is shared: see [`crate::ChangeBuilder`].
pub trait FixProvider {
    fn meta(&self) -> ProviderMeta;

    /// Raw candidates for one file, before whitelist and confidence filtering.
    ///
    /// Uses the syntax tree when present, otherwise a regex scan of the same
    /// text.
    fn find_candidates(&self, file: &SourceFile<'_>) -> Vec<FixCandidate>;
}

pub fn builtin_providers() -> Vec<Box<dyn FixProvider>> {
    vec![Box::new(ConsoleLogProvider), Box::new(DebuggerProvider)]
}

pub fn builtin_provider_metas() -> Vec<ProviderMeta> {
    builtin_providers().iter().map(|p| p.meta()).collect()
}

/// 1-based position of a tree-sitter node.
pub(crate) fn node_position(node: tree_sitter::Node<'_>) -> (usize, usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    (start.row + 1, start.column + 1, end.row + 1)
}

/// How the text before a regex match relates to the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prefix {
    /// Start of line or after `;`, `{`, `}`.
    Boundary,
    /// After `)`, `else` or `do`: an unbraced control-flow body.
    BareBody,
    /// After `&&`, `||`, `?`, `:` or `,`: part of a larger expression.
    Expression,
    /// Value position (assignment, argument, return): never a candidate.
    Value,
}

pub(crate) fn classify_prefix(prefix: &str) -> Prefix {
    let p = prefix.trim_end();
    if p.is_empty() || p.ends_with(';') || p.ends_with('{') || p.ends_with('}') {
        return Prefix::Boundary;
    }
    if p.ends_with(')') || ends_with_word(p, "else") || ends_with_word(p, "do") {
        return Prefix::BareBody;
    }
    let operand = ["&&", "||", "?", ":", ","];
    if operand.iter().any(|op| p.ends_with(*op)) {
        return Prefix::Expression;
    }
    Prefix::Value
}

/// [`classify_prefix`] for a match at byte `start` of `lines[idx]`.
///
/// A match opening its line is classified by the previous non-blank line, so
/// `if (a)` followed by the call on its own line is still an unbraced body.
pub(crate) fn classify_match(lines: &[&str], idx: usize, start: usize) -> Prefix {
    let prefix = &lines[idx][..start];
    if !prefix.trim().is_empty() {
        return classify_prefix(prefix);
    }
    let previous = lines[..idx]
        .iter()
        .rev()
        .map(|l| l.trim_end())
        .find(|l| !l.is_empty());
    match previous {
        Some(p) if p.ends_with(')') || ends_with_word(p, "else") || ends_with_word(p, "do") => {
            Prefix::BareBody
        }
        _ => Prefix::Boundary,
    }
}

fn ends_with_word(s: &str, word: &str) -> bool {
    s.strip_suffix(word).is_some_and(|rest| {
        rest.chars()
            .last()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_' && c != '$')
    })
}
