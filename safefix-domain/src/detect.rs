use crate::ports::RepoView;
use crate::providers::{FixProvider, SourceFile};
use crate::scan::{SourceLanguage, is_test_file, parse_source};
use crate::whitelist::Whitelist;
use camino::Utf8Path;
use safefix_types::candidate::FixCandidate;
use tracing::debug;

/// Candidates below this confidence are dropped unless configured otherwise.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct DetectContext {
    pub min_confidence: f64,
    pub whitelist: Whitelist,
}

impl Default for DetectContext {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            whitelist: Whitelist::default(),
        }
    }
}

/// Runs one provider over one file and applies the shared filters:
/// test-file skipping, whitelist suppression, and the confidence threshold.
pub struct Detector<'a> {
    ctx: &'a DetectContext,
}

impl<'a> Detector<'a> {
    pub fn new(ctx: &'a DetectContext) -> Self {
        Self { ctx }
    }

    /// Read, parse and scan `path` for one category.
    ///
    /// Test files and unsupported extensions yield no candidates.
    pub fn detect(
        &self,
        provider: &dyn FixProvider,
        repo: &dyn RepoView,
        path: &Utf8Path,
    ) -> anyhow::Result<Vec<FixCandidate>> {
        if is_test_file(path) || SourceLanguage::from_path(path).is_none() {
            return Ok(Vec::new());
        }
        let text = repo.read_source(path)?;
        let tree = parse_source(path, &text);
        if tree.is_none() {
            debug!(file = %path, "using regex fallback");
        }
        let file = SourceFile {
            path,
            text: &text,
            tree: tree.as_ref(),
        };
        Ok(self.detect_source(provider, &file))
    }

    /// Scan already-loaded content.
    pub fn detect_source(
        &self,
        provider: &dyn FixProvider,
        file: &SourceFile<'_>,
    ) -> Vec<FixCandidate> {
        let lines = file.lines();
        provider
            .find_candidates(file)
            .into_iter()
            .filter(|c| {
                if c.confidence < self.ctx.min_confidence {
                    debug!(
                        file = %c.file,
                        line = c.line,
                        confidence = c.confidence,
                        "below confidence threshold"
                    );
                    return false;
                }
                if self.ctx.whitelist.suppresses(&lines, c.line) {
                    debug!(file = %c.file, line = c.line, "suppressed by whitelist");
                    return false;
                }
                true
            })
            .collect()
    }
}
