//! Parsing and text-scanning helpers shared by every provider.

use camino::Utf8Path;
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Tree};

/// Languages the detectors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension()? {
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    fn tree_sitter_language(self) -> Language {
        match self {
            // JSX is legal in plain .js files, so JavaScript uses the TSX grammar.
            SourceLanguage::JavaScript | SourceLanguage::Tsx => {
                tree_sitter_typescript::LANGUAGE_TSX.into()
            }
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

/// Parse `text` into a syntax tree.
///
/// Returns `None` when the language is unsupported, the parser cannot be set
/// up, or the tree contains error nodes. Callers fall back to a regex scan.
pub fn parse_source(path: &Utf8Path, text: &str) -> Option<Tree> {
    let lang = SourceLanguage::from_path(path)?;
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&lang.tree_sitter_language()) {
        debug!(path = %path, error = %e, "tree-sitter language setup failed");
        return None;
    }
    let tree = parser.parse(text, None)?;
    if tree.root_node().has_error() {
        debug!(path = %path, "syntax tree contains errors");
        return None;
    }
    Some(tree)
}

/// Directory names whose contents are treated as tests.
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "__mocks__", "spec", "e2e"];

/// True when `path` follows a test-file naming or directory convention.
///
/// Debug output in tests is assumed to be intentional.
pub fn is_test_file(path: &Utf8Path) -> bool {
    if let Some(name) = path.file_name()
        && (name.contains(".test.") || name.contains(".spec."))
    {
        return true;
    }
    let Some(parent) = path.parent() else {
        return false;
    };
    parent
        .components()
        .any(|c| TEST_DIRS.contains(&c.as_str()))
}

/// Depth-first visit of every named node under `root`.
pub(crate) fn walk_named<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_named() {
            visit(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Statement kinds whose body may be a single unbraced statement.
pub(crate) const BARE_BODY_PARENTS: &[&str] = &[
    "if_statement",
    "else_clause",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "labeled_statement",
    "with_statement",
];

/// True when byte offset `at` in `line` sits inside a line comment or an
/// unterminated string literal. Quote tracking is approximate.
pub(crate) fn in_comment_or_string(line: &str, at: usize) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
        return true;
    }

    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';
    for (i, ch) in line.char_indices() {
        if i >= at {
            break;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
        } else if ch == '"' || ch == '\'' || ch == '`' {
            quote = Some(ch);
        } else if ch == '/' && prev == '/' {
            return true;
        }
        prev = ch;
    }
    quote.is_some()
}

/// Given `line` and the byte offset of an opening `(`, return the offset just
/// past its matching `)` on the same line, skipping string contents.
pub(crate) fn matching_paren(line: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in line[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// True when every comma-separated argument in `args` is a plain literal.
/// An empty argument list counts as literal.
pub(crate) fn args_are_literals(args: &str) -> bool {
    let inner = args.trim();
    if inner.is_empty() {
        return true;
    }
    split_args(inner).iter().all(|a| is_literal(a.trim()))
}

fn split_args(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

fn is_literal(arg: &str) -> bool {
    if arg.is_empty() {
        return false;
    }
    if matches!(arg, "true" | "false" | "null" | "undefined") {
        return true;
    }
    if arg.parse::<f64>().is_ok() {
        return true;
    }
    let bytes = arg.as_bytes();
    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    if arg.len() >= 2 && (first == b'"' || first == b'\'') && first == last {
        return true;
    }
    arg.len() >= 2 && first == b'`' && last == b'`' && !arg.contains("${")
}

/// Text heuristics for an expression fragment that may have side effects.
pub(crate) fn has_side_effect_text(args: &str) -> bool {
    args.contains("++")
        || args.contains("--")
        || args.contains("await ")
        || args.contains("new ")
        || args.contains('(')
        || has_assignment(args)
}

fn has_assignment(s: &str) -> bool {
    let b = s.as_bytes();
    for (i, &c) in b.iter().enumerate() {
        if c != b'=' {
            continue;
        }
        let prev = if i > 0 { b[i - 1] } else { b' ' };
        let next = b.get(i + 1).copied().unwrap_or(b' ');
        if next != b'=' && next != b'>' && !matches!(prev, b'=' | b'!' | b'<' | b'>') {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension() {
        assert_eq!(
            SourceLanguage::from_path(Utf8Path::new("a/b.mjs")),
            Some(SourceLanguage::JavaScript)
        );
        assert_eq!(
            SourceLanguage::from_path(Utf8Path::new("x.ts")),
            Some(SourceLanguage::TypeScript)
        );
        assert_eq!(
            SourceLanguage::from_path(Utf8Path::new("x.tsx")),
            Some(SourceLanguage::Tsx)
        );
        assert_eq!(SourceLanguage::from_path(Utf8Path::new("x.py")), None);
    }

    #[test]
    fn parse_source_accepts_valid_js() {
        let tree = parse_source(Utf8Path::new("a.js"), "function f() { return 1; }\n");
        assert!(tree.is_some());
    }

    #[test]
    fn parse_source_rejects_broken_js() {
        let tree = parse_source(Utf8Path::new("a.js"), "function f( { console.log(1);\n");
        assert!(tree.is_none());
    }

    #[test]
    fn test_file_conventions() {
        assert!(is_test_file(Utf8Path::new("src/app.test.js")));
        assert!(is_test_file(Utf8Path::new("src/app.spec.ts")));
        assert!(is_test_file(Utf8Path::new("src/__tests__/app.js")));
        assert!(is_test_file(Utf8Path::new("tests/helpers.js")));
        assert!(!is_test_file(Utf8Path::new("src/testing.js")));
        assert!(!is_test_file(Utf8Path::new("src/latest/app.js")));
    }

    #[test]
    fn comment_and_string_detection() {
        assert!(in_comment_or_string("// console.log(1)", 3));
        assert!(in_comment_or_string("foo(); // console.log(1)", 10));
        assert!(in_comment_or_string("const s = 'console.log(1)';", 11));
        assert!(!in_comment_or_string("const s = 'a'; console.log(1);", 15));
    }

    #[test]
    fn matching_paren_skips_strings() {
        let line = "console.log(')', x); rest";
        let open = line.find('(').unwrap();
        let end = matching_paren(line, open).unwrap();
        assert_eq!(&line[..end], "console.log(')', x)");
        assert_eq!(matching_paren("console.log(a,", 11), None);
    }

    #[test]
    fn literal_argument_detection() {
        assert!(args_are_literals("'hello world'"));
        assert!(args_are_literals("\"a\", 1, true, null"));
        assert!(args_are_literals(""));
        assert!(args_are_literals("`plain`"));
        assert!(!args_are_literals("`x ${y}`"));
        assert!(!args_are_literals("'value:', x"));
    }

    #[test]
    fn side_effect_heuristics() {
        assert!(has_side_effect_text("count++"));
        assert!(has_side_effect_text("fetchData()"));
        assert!(has_side_effect_text("x = 1"));
        assert!(!has_side_effect_text("x === 1"));
        assert!(!has_side_effect_text("'value:', x"));
    }
}
