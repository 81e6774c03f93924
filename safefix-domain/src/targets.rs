use crate::scan::SourceLanguage;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &["node_modules", "dist", "build", "coverage", "out", "target"];

/// Expand `inputs` (files or directories, relative to `root` or absolute) into
/// a sorted list of project-relative source files.
///
/// An empty input list means the whole project. Explicit file inputs are kept
/// as given even when their extension is unsupported; directory walks only
/// pick up supported sources and skip hidden and build directories.
pub fn discover_targets(
    root: &Utf8Path,
    inputs: &[Utf8PathBuf],
) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut out = Vec::new();
    if inputs.is_empty() {
        walk(root, root, &mut out)?;
    }
    for input in inputs {
        let abs = if input.is_absolute() {
            input.clone()
        } else {
            root.join(input)
        };
        if abs.is_dir() {
            walk(root, &abs, &mut out)?;
        } else if abs.is_file() {
            out.push(relative(root, &abs));
        } else {
            anyhow::bail!("target not found: {}", input);
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn walk(root: &Utf8Path, dir: &Utf8Path, out: &mut Vec<Utf8PathBuf>) -> anyhow::Result<()> {
    let entries = fs::read_dir(dir.as_std_path()).with_context(|| format!("list {dir}"))?;
    for entry in entries {
        let entry = entry?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let name = path.file_name().unwrap_or("");
        let ty = entry.file_type()?;
        if ty.is_dir() {
            if name.starts_with('.') || SKIP_DIRS.contains(&name) {
                continue;
            }
            walk(root, &path, out)?;
        } else if ty.is_file() && SourceLanguage::from_path(&path).is_some() {
            out.push(relative(root, &path));
        }
    }
    Ok(())
}

fn relative(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
