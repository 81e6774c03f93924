use crate::builder::ChangeBuilder;
use crate::detect::{DEFAULT_MIN_CONFIDENCE, DetectContext, Detector};
use crate::ports::RepoView;
use crate::providers::{self, FixProvider, SourceFile};
use crate::scan::{SourceLanguage, is_test_file, parse_source};
use crate::whitelist::Whitelist;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use safefix_types::candidate::FixCandidate;
use safefix_types::change::ChangeSet;
use safefix_types::config::{FixTypes, WhitelistConfig};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub min_confidence: f64,
    /// Stop once this many files have edits.
    pub max_files_per_run: Option<usize>,
    pub fix_types: FixTypes,
    pub whitelist: WhitelistConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_files_per_run: Some(100),
            fix_types: FixTypes::default(),
            whitelist: WhitelistConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectContext {
    pub project_root: Utf8PathBuf,
    pub config: CollectorConfig,
}

/// Result of the COLLECT phase.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub change_set: ChangeSet,
    /// Candidates that passed every filter, in file order.
    pub candidates: Vec<FixCandidate>,
    pub files_scanned: usize,
    pub whitelisted: Vec<Utf8PathBuf>,
    pub test_files: Vec<Utf8PathBuf>,
    /// Files scanned with the regex fallback because parsing failed.
    pub regex_fallbacks: Vec<Utf8PathBuf>,
    pub unreadable: Vec<(Utf8PathBuf, String)>,
    /// Files left unscanned after `max_files_per_run` was reached.
    pub files_capped: usize,
}

pub struct Collector {
    providers: Vec<Box<dyn FixProvider>>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        Self {
            providers: providers::builtin_providers(),
        }
    }

    pub fn with_providers(providers: Vec<Box<dyn FixProvider>>) -> Self {
        Self { providers }
    }

    /// Scan `files` with every enabled provider and merge the results into
    /// one change set.
    ///
    /// Files are visited in sorted order so the cap and the output are
    /// deterministic. Each file is read and parsed once; all providers see
    /// the same snapshot of its content.
    pub fn collect(
        &self,
        ctx: &CollectContext,
        repo: &dyn RepoView,
        files: &[Utf8PathBuf],
    ) -> anyhow::Result<Collection> {
        let whitelist = Whitelist::compile(&ctx.config.whitelist).context("compile whitelist")?;
        let detect_ctx = DetectContext {
            min_confidence: ctx.config.min_confidence,
            whitelist,
        };
        let detector = Detector::new(&detect_ctx);

        let enabled: Vec<&dyn FixProvider> = self
            .providers
            .iter()
            .filter(|p| ctx.config.fix_types.enabled(p.meta().category))
            .map(|p| p.as_ref())
            .collect();

        let mut files: Vec<Utf8PathBuf> = files
            .iter()
            .map(|f| relativize(&ctx.project_root, f))
            .collect();
        files.sort();
        files.dedup();

        let mut out = Collection::default();
        let mut files_with_edits = 0usize;

        for (idx, path) in files.iter().enumerate() {
            if ctx
                .config
                .max_files_per_run
                .is_some_and(|max| files_with_edits >= max)
            {
                out.files_capped = files.len() - idx;
                warn!(
                    max = files_with_edits,
                    remaining = out.files_capped,
                    "max_files_per_run reached; remaining files not scanned"
                );
                break;
            }

            if detect_ctx.whitelist.excludes_file(path) {
                debug!(file = %path, "whitelisted file");
                out.whitelisted.push(path.clone());
                continue;
            }
            if is_test_file(path) {
                debug!(file = %path, "test file");
                out.test_files.push(path.clone());
                continue;
            }
            if SourceLanguage::from_path(path).is_none() {
                continue;
            }

            let text = match repo.read_source(path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(file = %path, error = %e, "cannot read file; skipping");
                    out.unreadable.push((path.clone(), format!("{e:#}")));
                    continue;
                }
            };
            out.files_scanned += 1;

            let tree = parse_source(path, &text);
            if tree.is_none() {
                debug!(file = %path, "parse failed; using regex fallback");
                out.regex_fallbacks.push(path.clone());
            }
            let file = SourceFile {
                path,
                text: &text,
                tree: tree.as_ref(),
            };

            // All categories go through one builder call so fragments on a
            // shared line are excised together.
            let found: Vec<FixCandidate> = enabled
                .iter()
                .flat_map(|p| detector.detect_source(*p, &file))
                .collect();
            if found.is_empty() {
                continue;
            }
            let edits = ChangeBuilder::new(path, &text).build(&found);
            out.candidates.extend(found);

            if !edits.is_empty() {
                out.change_set.extend_file(path, edits);
                files_with_edits += 1;
            }
        }

        info!(
            files_scanned = out.files_scanned,
            files_changed = files_with_edits,
            edits = out.change_set.total_edits(),
            "collection finished"
        );
        Ok(out)
    }
}

fn relativize(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
