use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;

/// Larger sources are almost always bundled or minified output.
pub const MAX_SOURCE_BYTES: u64 = 2 * 1024 * 1024;

/// Read-only view of the project being scanned.
pub trait RepoView {
    fn root(&self) -> &Utf8Path;

    /// Source text of a project-relative file.
    ///
    /// Fails for files that are unreadable, larger than [`MAX_SOURCE_BYTES`],
    /// or not UTF-8; the collector records those and moves on.
    fn read_source(&self, rel: &Utf8Path) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct FsRepoView {
    root: Utf8PathBuf,
}

impl FsRepoView {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }
}

impl RepoView for FsRepoView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_source(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        let abs = if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        };
        let len = fs::metadata(&abs)?.len();
        if len > MAX_SOURCE_BYTES {
            bail!("{abs} is {len} bytes, over the {MAX_SOURCE_BYTES} byte scan limit");
        }
        let bytes = fs::read(&abs)?;
        String::from_utf8(bytes).with_context(|| format!("{abs} is not UTF-8 text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> (tempfile::TempDir, FsRepoView) {
        let td = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        (td, FsRepoView::new(root))
    }

    #[test]
    fn reads_relative_sources() {
        let (_td, repo) = sandbox();
        fs::write(repo.root().join("a.js"), "debugger;\n").unwrap();
        assert_eq!(repo.read_source(Utf8Path::new("a.js")).unwrap(), "debugger;\n");
    }

    #[test]
    fn rejects_binary_and_oversized_files() {
        let (_td, repo) = sandbox();
        fs::write(repo.root().join("bin.js"), [0xff, 0xfe, 0x00]).unwrap();
        let err = repo.read_source(Utf8Path::new("bin.js")).unwrap_err();
        assert!(format!("{err:#}").contains("not UTF-8"));

        let big = "x".repeat(MAX_SOURCE_BYTES as usize + 1);
        fs::write(repo.root().join("bundle.js"), big).unwrap();
        let err = repo.read_source(Utf8Path::new("bundle.js")).unwrap_err();
        assert!(err.to_string().contains("scan limit"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_td, repo) = sandbox();
        assert!(repo.read_source(Utf8Path::new("nope.js")).is_err());
    }
}
