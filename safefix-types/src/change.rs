use crate::candidate::FixCategory;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Line-level edit operation.
///
/// - `Remove` deletes line `line` entirely; `old_text` is the full line.
/// - `Replace` swaps the full line `old_text` for `new_text`.
/// - `Insert` places `new_text` as a new line before `line`
///   (`line == len + 1` appends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    Remove,
    Replace,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub file: Utf8PathBuf,

    /// 1-based.
    pub line: usize,

    pub op: EditOp,

    #[serde(default)]
    pub old_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,

    pub description: String,

    pub category: FixCategory,
}

impl Edit {
    pub fn remove(
        file: &Utf8Path,
        line: usize,
        old_text: impl Into<String>,
        category: FixCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            op: EditOp::Remove,
            old_text: old_text.into(),
            new_text: None,
            description: description.into(),
            category,
        }
    }

    pub fn replace(
        file: &Utf8Path,
        line: usize,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
        category: FixCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            op: EditOp::Replace,
            old_text: old_text.into(),
            new_text: Some(new_text.into()),
            description: description.into(),
            category,
        }
    }

    pub fn insert(
        file: &Utf8Path,
        line: usize,
        new_text: impl Into<String>,
        category: FixCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            op: EditOp::Insert,
            old_text: String::new(),
            new_text: Some(new_text.into()),
            description: description.into(),
            category,
        }
    }
}

/// Edits for one file, in the order they were built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChanges {
    pub path: Utf8PathBuf,
    pub edits: Vec<Edit>,
}

/// The full proposed edit set for one transaction.
///
/// Files are kept sorted by path so previews and summaries are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub files: Vec<FileChanges>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edits(edits: impl IntoIterator<Item = Edit>) -> Self {
        let mut grouped: BTreeMap<Utf8PathBuf, Vec<Edit>> = BTreeMap::new();
        for edit in edits {
            grouped.entry(edit.file.clone()).or_default().push(edit);
        }
        Self {
            files: grouped
                .into_iter()
                .map(|(path, edits)| FileChanges { path, edits })
                .collect(),
        }
    }

    /// Append edits for `path`, merging into an existing group.
    pub fn extend_file(&mut self, path: &Utf8Path, edits: Vec<Edit>) {
        if edits.is_empty() {
            return;
        }
        match self.files.binary_search_by(|f| f.path.as_path().cmp(path)) {
            Ok(idx) => self.files[idx].edits.extend(edits),
            Err(idx) => self.files.insert(
                idx,
                FileChanges {
                    path: path.to_path_buf(),
                    edits,
                },
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|f| f.edits.is_empty())
    }

    pub fn total_edits(&self) -> u64 {
        self.files.iter().map(|f| f.edits.len() as u64).sum()
    }

    pub fn files_touched(&self) -> Vec<&Utf8Path> {
        self.files
            .iter()
            .filter(|f| !f.edits.is_empty())
            .map(|f| f.path.as_path())
            .collect()
    }

    pub fn file(&self, path: &Utf8Path) -> Option<&FileChanges> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn edits(&self) -> impl Iterator<Item = &Edit> {
        self.files.iter().flat_map(|f| f.edits.iter())
    }

    pub fn category_counts(&self) -> BTreeMap<FixCategory, u64> {
        let mut out = BTreeMap::new();
        for e in self.edits() {
            *out.entry(e.category).or_insert(0) += 1;
        }
        out
    }

    /// A new change set containing only files for which `keep` returns true.
    pub fn filter_files(&self, mut keep: impl FnMut(&Utf8Path) -> bool) -> ChangeSet {
        ChangeSet {
            files: self
                .files
                .iter()
                .filter(|f| keep(&f.path))
                .cloned()
                .collect(),
        }
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut per_category: BTreeMap<FixCategory, CategorySummary> = BTreeMap::new();
        let mut per_file = BTreeMap::new();

        for f in &self.files {
            if f.edits.is_empty() {
                continue;
            }
            per_file.insert(f.path.to_string(), f.edits.len() as u64);

            let mut seen = Vec::new();
            for e in &f.edits {
                let entry = per_category.entry(e.category).or_default();
                entry.edits += 1;
                if !seen.contains(&e.category) {
                    seen.push(e.category);
                    entry.files += 1;
                }
            }
        }

        ChangeSummary {
            total_edits: self.total_edits(),
            files: per_file.len() as u64,
            per_category,
            per_file,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub edits: u64,
    pub files: u64,
}

/// Aggregate counts for a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub total_edits: u64,
    pub files: u64,
    pub per_category: BTreeMap<FixCategory, CategorySummary>,
    pub per_file: BTreeMap<String, u64>,
}
