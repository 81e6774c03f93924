//! Turns candidates into line edits for one file.

use camino::Utf8Path;
use safefix_types::candidate::FixCandidate;
use safefix_types::change::Edit;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::debug;

/// Lines scanned past the start of an unterminated statement before giving up.
pub(crate) const MAX_SPAN_LINES: usize = 50;

/// Longest statement excerpt kept in an edit description.
const DESCRIPTION_EXCERPT: usize = 60;

/// Builds edits against one file's original content.
///
/// Lines touched by an earlier `build` call stay claimed, so repeated calls
/// never produce overlapping edits.
pub struct ChangeBuilder<'a> {
    path: &'a Utf8Path,
    lines: Vec<&'a str>,
    claimed: BTreeSet<usize>,
}

enum Span {
    SingleLine,
    MultiLine { end_line: usize, end_col: usize },
}

impl<'a> ChangeBuilder<'a> {
    pub fn new(path: &'a Utf8Path, source: &'a str) -> Self {
        Self {
            path,
            lines: source.lines().collect(),
            claimed: BTreeSet::new(),
        }
    }

    /// Lines already covered by an edit, 1-based.
    pub fn claimed_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.claimed.iter().copied()
    }

    /// Edits for `candidates`, ordered by line.
    ///
    /// Candidates whose text no longer matches the file, whose span cannot be
    /// found, or whose lines are already claimed produce nothing. Single-line
    /// candidates sharing the first or last line of a multi-line span are
    /// folded into that span's edits.
    pub fn build(&mut self, candidates: &[FixCandidate]) -> Vec<Edit> {
        let mut sorted: Vec<&FixCandidate> = candidates.iter().collect();
        sorted.sort_by_key(|c| (c.line, c.column));

        let mut single: BTreeMap<usize, Vec<&FixCandidate>> = BTreeMap::new();
        let mut multi: Vec<(&FixCandidate, usize, usize)> = Vec::new();
        for c in sorted {
            if self.claimed.contains(&c.line) {
                debug!(file = %self.path, line = c.line, "line already covered, skipping");
                continue;
            }
            match self.span_of(c) {
                Some(Span::SingleLine) => single.entry(c.line).or_default().push(c),
                Some(Span::MultiLine { end_line, end_col }) => multi.push((c, end_line, end_col)),
                None => {
                    debug!(file = %self.path, line = c.line, "statement end not found, skipping");
                }
            }
        }

        let mut edits = Vec::new();
        for (c, end_line, end_col) in multi {
            if (c.line..=end_line).any(|l| self.claimed.contains(&l)) {
                debug!(file = %self.path, line = c.line, end_line, "span overlaps an earlier edit");
                continue;
            }
            let head = single.remove(&c.line).unwrap_or_default();
            let tail = single.remove(&end_line).unwrap_or_default();
            edits.extend(self.multi_line_edits(c, end_line, end_col, &head, &tail));
            self.claimed.extend(c.line..=end_line);
        }

        for (line, group) in single {
            if self.claimed.contains(&line) {
                continue;
            }
            if let Some(edit) = self.single_line_edit(line, &group) {
                edits.push(edit);
                self.claimed.insert(line);
            }
        }

        edits.sort_by_key(|e| e.line);
        edits
    }

    fn line(&self, line: usize) -> Option<&'a str> {
        line.checked_sub(1).and_then(|i| self.lines.get(i)).copied()
    }

    fn span_of(&self, c: &FixCandidate) -> Option<Span> {
        let text = self.line(c.line)?;
        let first = first_segment(&c.matched_text);
        let start = locate(text, c.column, first)?;

        if let Some(end_line) = c.end_line {
            if end_line <= c.line {
                return Some(Span::SingleLine);
            }
            self.line(end_line)?;
            if c.matched_text.contains('\n') {
                let end_col = last_segment(&c.matched_text).len();
                return Some(Span::MultiLine { end_line, end_col });
            }
        } else if closes_on_line(&text[start..]) {
            return Some(Span::SingleLine);
        }

        self.scan_forward(c.line)
            .map(|(end_line, end_col)| Span::MultiLine { end_line, end_col })
    }

    /// First line after `start` holding `);` or ending in `)`.
    fn scan_forward(&self, start: usize) -> Option<(usize, usize)> {
        let last = (start + MAX_SPAN_LINES).min(self.lines.len());
        for line_no in start + 1..=last {
            let text = self.line(line_no)?;
            if let Some(pos) = text.find(");") {
                return Some((line_no, pos + 2));
            }
            let trimmed = text.trim_end();
            if trimmed.ends_with(')') {
                return Some((line_no, trimmed.len()));
            }
        }
        None
    }

    /// `text` with each candidate's span inside `window` swapped for its
    /// placeholder. `None` when none of them is found there.
    fn excise(
        &self,
        line: usize,
        text: &str,
        window: Range<usize>,
        group: &[&FixCandidate],
    ) -> Option<String> {
        let mut ranges: Vec<(usize, usize, &'static str)> = group
            .iter()
            .filter_map(|c| {
                let start = locate(text, c.column, &c.matched_text);
                if start.is_none() {
                    debug!(file = %self.path, line, "matched text not found on line");
                }
                start.map(|s| (s, s + c.matched_text.len(), c.site.placeholder()))
            })
            .filter(|(s, e, _)| window.start <= *s && *e <= window.end)
            .collect();
        ranges.sort_unstable();
        ranges.dedup();

        let mut kept: Vec<(usize, usize, &str)> = Vec::new();
        for r in ranges {
            if kept.last().is_some_and(|prev| r.0 < prev.1) {
                continue;
            }
            kept.push(r);
        }
        if kept.is_empty() {
            return None;
        }

        let mut body = text.to_string();
        for (start, end, placeholder) in kept.iter().rev() {
            body.replace_range(*start..*end, placeholder);
        }
        Some(body)
    }

    fn single_line_edit(&self, line: usize, group: &[&FixCandidate]) -> Option<Edit> {
        let text = self.line(line)?;
        let body = self.excise(line, text, 0..text.len(), group)?;

        let lead = group[0];
        let description = describe(group);
        if body.trim().is_empty() {
            return Some(Edit::remove(self.path, line, text, lead.category, description));
        }

        let replacement = format!("{}{}", indentation(text), body.trim());
        Some(Edit::replace(
            self.path,
            line,
            text,
            replacement,
            lead.category,
            description,
        ))
    }

    /// Edits for a span from `c.line` to `end_line`. `head` and `tail` are
    /// single-line candidates on the first and last line, excised alongside.
    fn multi_line_edits(
        &self,
        c: &FixCandidate,
        end_line: usize,
        end_col: usize,
        head: &[&FixCandidate],
        tail: &[&FixCandidate],
    ) -> Vec<Edit> {
        let mut edits = Vec::new();
        let span = end_line - c.line + 1;
        let description = |i: usize| {
            format!(
                "[{}] remove {} (line {i} of {span})",
                c.category.key(),
                excerpt(&c.matched_text)
            )
        };

        let Some(first) = self.line(c.line) else {
            return edits;
        };
        let start = locate(first, c.column, first_segment(&c.matched_text)).unwrap_or(0);
        let before = &first[..start];
        let before = self
            .excise(c.line, before, 0..start, head)
            .unwrap_or_else(|| before.to_string());
        let prefix = before.trim_end();
        let placeholder = c.site.placeholder();
        let opening = match (prefix.trim().is_empty(), placeholder.is_empty()) {
            (true, true) => None,
            (true, false) => Some(format!("{}{placeholder}", indentation(first))),
            (false, true) => Some(prefix.to_string()),
            (false, false) => Some(format!("{prefix} {placeholder}")),
        };
        match opening {
            None => edits.push(Edit::remove(self.path, c.line, first, c.category, description(1))),
            Some(text) => edits.push(Edit::replace(
                self.path,
                c.line,
                first,
                text,
                c.category,
                description(1),
            )),
        }

        for line_no in c.line + 1..end_line {
            if let Some(text) = self.line(line_no) {
                edits.push(Edit::remove(
                    self.path,
                    line_no,
                    text,
                    c.category,
                    description(line_no - c.line + 1),
                ));
            }
        }

        if let Some(last) = self.line(end_line) {
            let rest = self
                .excise(end_line, last, end_col..last.len(), tail)
                .unwrap_or_else(|| last.to_string());
            let suffix = rest.get(end_col..).unwrap_or("").trim();
            if suffix.is_empty() {
                edits.push(Edit::remove(
                    self.path,
                    end_line,
                    last,
                    c.category,
                    description(span),
                ));
            } else {
                let replacement = format!("{}{suffix}", indentation(first));
                edits.push(Edit::replace(
                    self.path,
                    end_line,
                    last,
                    replacement,
                    c.category,
                    description(span),
                ));
            }
        }
        edits
    }
}

/// Byte offset of `needle` in `text`, preferring the reported 1-based column.
fn locate(text: &str, column: usize, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let at = column.saturating_sub(1);
    if text.get(at..).is_some_and(|rest| rest.starts_with(needle)) {
        return Some(at);
    }
    text.find(needle)
}

fn first_segment(s: &str) -> &str {
    s.lines().next().unwrap_or("").trim_end_matches('\r')
}

fn last_segment(s: &str) -> &str {
    s.rsplit('\n').next().unwrap_or("")
}

fn indentation(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// True when every `(` opened in `fragment` is closed on the same line.
fn closes_on_line(fragment: &str) -> bool {
    match fragment.find('(') {
        Some(open) => crate::scan::matching_paren(fragment, open).is_some(),
        None => true,
    }
}

fn excerpt(matched: &str) -> String {
    let first = first_segment(matched).trim();
    if first.chars().count() <= DESCRIPTION_EXCERPT {
        return format!("`{first}`");
    }
    let cut: String = first.chars().take(DESCRIPTION_EXCERPT).collect();
    format!("`{cut}...`")
}

fn describe(group: &[&FixCandidate]) -> String {
    let mut keys: Vec<&str> = Vec::new();
    for c in group {
        if !keys.contains(&c.category.key()) {
            keys.push(c.category.key());
        }
    }
    let lead = excerpt(&group[0].matched_text);
    match group.len() {
        1 => format!("[{}] remove {lead}", keys.join(", ")),
        n => format!("[{}] remove {lead} and {} more on this line", keys.join(", "), n - 1),
    }
}
