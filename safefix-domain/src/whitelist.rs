use camino::Utf8Path;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use safefix_types::config::WhitelistConfig;
use thiserror::Error;

/// Marker comments that always preserve the line they sit on (or the next one).
pub const DEFAULT_PRESERVE_MARKERS: &[&str] = &[
    "// keep",
    "// safefix-keep",
    "// eslint-disable-line no-console",
    "// eslint-disable-next-line no-console",
];

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("invalid whitelist glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("invalid whitelist pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// Compiled whitelist.
#[derive(Debug, Clone)]
pub struct Whitelist {
    files: Vec<Pattern>,
    patterns: Vec<Regex>,
    markers: Vec<String>,
}

impl Default for Whitelist {
    /// Only the built-in preserve markers.
    fn default() -> Self {
        Self {
            files: Vec::new(),
            patterns: Vec::new(),
            markers: DEFAULT_PRESERVE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

const GLOB_OPTS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl Whitelist {
    pub fn compile(config: &WhitelistConfig) -> Result<Self, WhitelistError> {
        let files = config
            .files
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| WhitelistError::InvalidGlob {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let patterns = config
            .patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| WhitelistError::InvalidRegex {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut markers = Whitelist::default().markers;
        for m in &config.comments {
            let m = m.trim();
            if !m.is_empty() && !markers.iter().any(|x| x == m) {
                markers.push(m.to_string());
            }
        }

        Ok(Self {
            files,
            patterns,
            markers,
        })
    }

    /// True when `rel` (project-relative) matches a whitelist glob.
    ///
    /// A glob without `/` also matches against the file name alone, so
    /// `*.min.js` covers nested files.
    pub fn excludes_file(&self, rel: &Utf8Path) -> bool {
        let normalized = rel.as_str().replace('\\', "/");
        let name = rel.file_name().unwrap_or("");
        self.files.iter().any(|p| {
            p.matches_with(&normalized, GLOB_OPTS)
                || (!p.as_str().contains('/') && p.matches_with(name, GLOB_OPTS))
        })
    }

    /// True when `line` carries a whitelist pattern or preserve marker.
    ///
    /// Markers match as whole tokens: `// keep` does not match `// keeps`.
    pub fn preserves_line(&self, line: &str) -> bool {
        self.markers.iter().any(|m| contains_marker(line, m))
            || self.patterns.iter().any(|r| r.is_match(line))
    }

    /// Suppression check for a candidate at 1-based `line`: its own line or
    /// the line immediately before it.
    pub fn suppresses(&self, lines: &[&str], line: usize) -> bool {
        let own = line.checked_sub(1).and_then(|i| lines.get(i));
        let prev = line.checked_sub(2).and_then(|i| lines.get(i));
        [own, prev]
            .into_iter()
            .flatten()
            .any(|l| self.preserves_line(l))
    }
}

fn is_marker_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn contains_marker(line: &str, marker: &str) -> bool {
    let joins_before = marker.chars().next().is_some_and(is_marker_char);
    let joins_after = marker.chars().next_back().is_some_and(is_marker_char);
    line.match_indices(marker).any(|(at, _)| {
        let before = line[..at].chars().next_back();
        let after = line[at + marker.len()..].chars().next();
        !(joins_before && before.is_some_and(is_marker_char))
            && !(joins_after && after.is_some_and(is_marker_char))
    })
}
