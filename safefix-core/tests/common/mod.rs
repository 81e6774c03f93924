#![allow(dead_code)]

use anyhow::bail;
use camino::{Utf8Path, Utf8PathBuf};
use safefix_core::FixSettings;
use safefix_core::adapters::FsWritePort;
use safefix_core::ports::{CommandOutput, CommandRunner, VcsPort, VcsStatus, WritePort};
use safefix_types::config::{CustomCommand, ValidationConfig};
use std::cell::RefCell;
use std::time::Duration;
use tempfile::TempDir;

/// In-memory VCS. `status == None` means "not a repository".
#[derive(Default)]
pub struct StubVcs {
    pub status: Option<VcsStatus>,
    pub fail_commit: bool,
    pub branches: RefCell<Vec<String>>,
    pub commits: RefCell<Vec<(Vec<Utf8PathBuf>, String)>>,
}

impl StubVcs {
    pub fn clean() -> Self {
        Self {
            status: Some(VcsStatus {
                branch: Some("main".into()),
                head: Some("a".repeat(40)),
                dirty_paths: vec![],
            }),
            ..Self::default()
        }
    }

    pub fn dirty(paths: &[&str]) -> Self {
        let mut vcs = Self::clean();
        if let Some(s) = vcs.status.as_mut() {
            s.dirty_paths = paths.iter().map(|p| p.to_string()).collect();
        }
        vcs
    }

    pub fn unversioned() -> Self {
        Self::default()
    }
}

impl VcsPort for StubVcs {
    fn status(&self, _: &Utf8Path) -> anyhow::Result<Option<VcsStatus>> {
        Ok(self.status.clone())
    }

    fn branch_exists(&self, _: &Utf8Path, name: &str) -> anyhow::Result<bool> {
        Ok(self.branches.borrow().iter().any(|b| b == name))
    }

    fn create_branch(&self, _: &Utf8Path, name: &str) -> anyhow::Result<()> {
        self.branches.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn reset_hard(&self, _: &Utf8Path, _: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn commit(&self, _: &Utf8Path, paths: &[Utf8PathBuf], message: &str) -> anyhow::Result<String> {
        if self.fail_commit {
            bail!("commit hook rejected the commit");
        }
        self.commits
            .borrow_mut()
            .push((paths.to_vec(), message.to_string()));
        Ok("c".repeat(40))
    }
}

/// Passes every command except those listed in `failing`.
#[derive(Default)]
pub struct FakeRunner {
    pub failing: Vec<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeRunner {
    pub fn failing(commands: &[&str]) -> Self {
        Self {
            failing: commands.iter().map(|c| c.to_string()).collect(),
            calls: RefCell::default(),
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        command: &str,
        _: &Utf8Path,
        _: Duration,
        _: usize,
    ) -> anyhow::Result<CommandOutput> {
        self.calls.borrow_mut().push(command.to_string());
        let ok = !self.failing.iter().any(|c| c == command);
        Ok(CommandOutput {
            exit_code: Some(if ok { 0 } else { 1 }),
            success: ok,
            timed_out: false,
            output: if ok {
                String::new()
            } else {
                format!("{command}: 1 failing assertion")
            },
            truncated: false,
            duration: Duration::from_millis(3),
        })
    }
}

/// Writes through to disk but fails for paths ending in `fail_on`.
pub struct FlakyWriter {
    pub fail_on: &'static str,
}

impl WritePort for FlakyWriter {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if path.as_str().ends_with(self.fail_on) {
            bail!("disk full");
        }
        FsWritePort.write_file(path, contents)
    }
}

pub struct Sandbox {
    _project: TempDir,
    _snapshots: TempDir,
    pub root: Utf8PathBuf,
    pub snapshots: Utf8PathBuf,
}

impl Sandbox {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let project = TempDir::new().expect("project dir");
        let snapshots = TempDir::new().expect("snapshot dir");
        let root = Utf8PathBuf::from_path_buf(project.path().to_path_buf()).expect("utf8");
        let snap = Utf8PathBuf::from_path_buf(snapshots.path().to_path_buf()).expect("utf8");
        for (path, text) in files {
            let abs = root.join(path);
            std::fs::create_dir_all(abs.parent().expect("parent")).expect("mkdir");
            std::fs::write(&abs, text).expect("write");
        }
        Self {
            _project: project,
            _snapshots: snapshots,
            root,
            snapshots: snap,
        }
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.root.join(path)).expect("read")
    }

    /// Settings with the given `(name, command)` checks and nothing else enabled.
    pub fn settings(&self, checks: &[(&str, &str)]) -> FixSettings {
        FixSettings {
            project_root: self.root.clone(),
            snapshot_root: self.snapshots.clone(),
            validation: ValidationConfig {
                custom_commands: checks
                    .iter()
                    .map(|(name, command)| CustomCommand {
                        name: name.to_string(),
                        command: command.to_string(),
                    })
                    .collect(),
                ..ValidationConfig::disabled()
            },
            ..FixSettings::default()
        }
    }

    pub fn snapshot_count(&self) -> usize {
        std::fs::read_dir(&self.snapshots)
            .map(|d| d.count())
            .unwrap_or(0)
    }
}

pub const APP_JS: &str = "function greet() {\n  console.log('hello world');\n  return 1;\n}\n";
pub const APP_JS_FIXED: &str = "function greet() {\n  return 1;\n}\n";
pub const UTIL_JS: &str = "let x = 1;\ndebugger;\nexport { x };\n";
pub const UTIL_JS_FIXED: &str = "let x = 1;\nexport { x };\n";
