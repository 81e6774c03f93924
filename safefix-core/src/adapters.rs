//! Default process- and terminal-backed port implementations.

use crate::ports::{
    CommandOutput, CommandRunner, Decision, DecisionProvider, FileDecision, VcsPort, VcsStatus,
    WritePort,
};
use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use safefix_render::{render_edit_list, render_file_header, render_summary};
use safefix_types::change::{ChangeSummary, FileChanges};
use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Git operations by shelling out to `git -C <root>`.
#[derive(Debug, Clone, Default)]
pub struct ShellGitPort;

fn git(root: &Utf8Path, args: &[&str]) -> anyhow::Result<Output> {
    Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .with_context(|| format!("run git {}", args.join(" ")))
}

fn git_stdout(root: &Utf8Path, args: &[&str]) -> anyhow::Result<String> {
    let out = git(root, args)?;
    if !out.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim_end().to_string())
}

impl VcsPort for ShellGitPort {
    fn status(&self, root: &Utf8Path) -> anyhow::Result<Option<VcsStatus>> {
        let inside = match git(root, &["rev-parse", "--is-inside-work-tree"]) {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "git unavailable; treating {} as unversioned", root);
                return Ok(None);
            }
        };
        if !inside.status.success() {
            return Ok(None);
        }

        // symbolic-ref also works on an unborn branch; detached HEAD yields None.
        let branch = git_stdout(root, &["symbolic-ref", "--short", "-q", "HEAD"])
            .ok()
            .filter(|b| !b.is_empty());
        let head = git_stdout(root, &["rev-parse", "--verify", "-q", "HEAD"])
            .ok()
            .filter(|h| !h.is_empty());
        let porcelain = git_stdout(root, &["status", "--porcelain"])?;
        let dirty_paths = porcelain
            .lines()
            .filter_map(|l| l.get(3..))
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Some(VcsStatus {
            branch,
            head,
            dirty_paths,
        }))
    }

    fn branch_exists(&self, root: &Utf8Path, name: &str) -> anyhow::Result<bool> {
        let reference = format!("refs/heads/{name}");
        let out = git(root, &["rev-parse", "--verify", "-q", &reference])?;
        Ok(out.status.success())
    }

    fn create_branch(&self, root: &Utf8Path, name: &str) -> anyhow::Result<()> {
        git_stdout(root, &["branch", name]).map(|_| ())
    }

    fn reset_hard(&self, root: &Utf8Path, name: &str) -> anyhow::Result<()> {
        git_stdout(root, &["reset", "--hard", name]).map(|_| ())
    }

    fn commit(
        &self,
        root: &Utf8Path,
        paths: &[Utf8PathBuf],
        message: &str,
    ) -> anyhow::Result<String> {
        let mut add = vec!["add", "--"];
        add.extend(paths.iter().map(|p| p.as_str()));
        git_stdout(root, &add)?;

        let mut commit = vec!["commit", "-q", "-m", message, "--"];
        commit.extend(paths.iter().map(|p| p.as_str()));
        git_stdout(root, &commit)?;

        git_stdout(root, &["rev-parse", "HEAD"])
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs_err::write(path, contents).with_context(|| format!("write {}", path))
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// How long to wait for output pipes after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);
/// Upper bound on a single wait; keeps `Instant + timeout` from overflowing.
const MAX_WAIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const TRUNCATION_MARKER: &str = "[... output truncated ...]\n";

/// Runs commands through the platform shell with a deadline.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

/// The shell leads a fresh process group so a timeout can take down
/// everything it started.
#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]).process_group(0);
    cmd
}

/// Kill the child and every process in its group. The child must not have
/// been reaped yet, so its pid still names our group.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group was created for this
        // child by `process_group(0)` and the leader is not yet reaped.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc == 0 {
            return;
        }
        debug!(error = %io::Error::last_os_error(), "killpg after timeout");
    }
    if let Err(e) = child.kill() {
        debug!(error = %e, "kill after timeout");
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "kill after timeout");
    }
}

/// Keeps the last `max` bytes written to it.
#[derive(Debug)]
struct TailBuffer {
    bytes: Vec<u8>,
    max: usize,
    dropped: bool,
}

impl TailBuffer {
    fn new(max: usize) -> Self {
        Self {
            bytes: Vec::new(),
            max,
            dropped: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
        if self.bytes.len() > self.max {
            let excess = self.bytes.len() - self.max;
            self.bytes.drain(..excess);
            self.dropped = true;
        }
    }

    fn render(&self) -> (String, bool) {
        let text = String::from_utf8_lossy(&self.bytes);
        if self.dropped {
            (format!("{TRUNCATION_MARKER}{text}"), true)
        } else {
            (text.into_owned(), false)
        }
    }
}

fn spawn_reader(
    mut source: impl Read + Send + 'static,
    sink: Arc<Mutex<TailBuffer>>,
    done: mpsc::Sender<()>,
) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = done.send(());
    });
}

/// Wait for the child up to `timeout`. On expiry its whole process group is
/// killed and the child reaped before returning.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> anyhow::Result<(Option<ExitStatus>, bool)> {
    if let Some(status) = child
        .wait_timeout(timeout.min(MAX_WAIT))
        .context("wait for child process")?
    {
        return Ok((Some(status), false));
    }
    kill_process_tree(child);
    if let Err(e) = child.wait() {
        warn!(error = %e, "could not reap timed-out child");
    }
    Ok((None, true))
}

impl CommandRunner for ShellCommandRunner {
    fn run(
        &self,
        command: &str,
        cwd: &Utf8Path,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> anyhow::Result<CommandOutput> {
        let started = Instant::now();
        let mut child = shell(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn `{command}` in {cwd}"))?;

        let sink = Arc::new(Mutex::new(TailBuffer::new(max_output_bytes)));
        let (done_tx, done_rx) = mpsc::channel();
        let mut readers = 0;
        if let Some(out) = child.stdout.take() {
            spawn_reader(out, Arc::clone(&sink), done_tx.clone());
            readers += 1;
        }
        if let Some(err) = child.stderr.take() {
            spawn_reader(err, Arc::clone(&sink), done_tx.clone());
            readers += 1;
        }
        drop(done_tx);

        let (status, timed_out) = wait_with_deadline(&mut child, timeout)?;

        let drain_deadline = Instant::now() + DRAIN_GRACE;
        for _ in 0..readers {
            let left = drain_deadline.saturating_duration_since(Instant::now());
            if done_rx.recv_timeout(left).is_err() {
                debug!(command, "output pipes still open after exit; using partial output");
                break;
            }
        }

        let (output, truncated) = sink.lock().unwrap_or_else(PoisonError::into_inner).render();
        let exit_code = status.and_then(|s| s.code());
        let success = !timed_out && status.is_some_and(|s| s.success());
        Ok(CommandOutput {
            exit_code,
            success,
            timed_out,
            output,
            truncated,
            duration: started.elapsed(),
        })
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Accepts everything without asking. Never commits on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAccept;

impl DecisionProvider for AlwaysAccept {
    fn decide(&mut self, _: &ChangeSummary, _: &str) -> anyhow::Result<Decision> {
        Ok(Decision::AcceptAll)
    }

    fn review_file(&mut self, _: &FileChanges, _: &str) -> anyhow::Result<FileDecision> {
        Ok(FileDecision::Accept)
    }

    fn confirm_commit(&mut self, _: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Declines everything: the run ends at PREVIEW with nothing written.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReject;

impl DecisionProvider for AlwaysReject {
    fn decide(&mut self, _: &ChangeSummary, _: &str) -> anyhow::Result<Decision> {
        Ok(Decision::SkipAll)
    }

    fn review_file(&mut self, _: &FileChanges, _: &str) -> anyhow::Result<FileDecision> {
        Ok(FileDecision::Reject)
    }

    fn confirm_commit(&mut self, _: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Replays queued answers. An exhausted queue answers Abort, Reject and no.
#[derive(Debug, Clone)]
pub struct ScriptedDecisions {
    decisions: VecDeque<Decision>,
    files: VecDeque<FileDecision>,
    commits: VecDeque<bool>,
    /// Files offered for review, in order.
    pub reviewed: Vec<Utf8PathBuf>,
    /// Commit messages offered for confirmation.
    pub commit_prompts: Vec<String>,
}

impl ScriptedDecisions {
    pub fn new(decision: Decision) -> Self {
        Self {
            decisions: VecDeque::from([decision]),
            files: VecDeque::new(),
            commits: VecDeque::new(),
            reviewed: Vec::new(),
            commit_prompts: Vec::new(),
        }
    }

    pub fn with_file(mut self, answer: FileDecision) -> Self {
        self.files.push_back(answer);
        self
    }

    pub fn with_commit(mut self, answer: bool) -> Self {
        self.commits.push_back(answer);
        self
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide(&mut self, _: &ChangeSummary, _: &str) -> anyhow::Result<Decision> {
        Ok(self.decisions.pop_front().unwrap_or(Decision::Abort))
    }

    fn review_file(&mut self, file: &FileChanges, _: &str) -> anyhow::Result<FileDecision> {
        self.reviewed.push(file.path.clone());
        Ok(self.files.pop_front().unwrap_or(FileDecision::Reject))
    }

    fn confirm_commit(&mut self, message: &str) -> anyhow::Result<bool> {
        self.commit_prompts.push(message.to_string());
        Ok(self.commits.pop_front().unwrap_or(false))
    }
}

/// Line-oriented prompts. End of input counts as the most conservative answer.
pub struct TerminalDecisions<R, W> {
    input: R,
    output: W,
}

impl TerminalDecisions<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalDecisions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line).context("read answer")? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_ascii_lowercase()))
    }
}

impl<R: BufRead, W: Write> DecisionProvider for TerminalDecisions<R, W> {
    fn decide(&mut self, summary: &ChangeSummary, preview: &str) -> anyhow::Result<Decision> {
        write!(self.output, "{}\n{preview}", render_summary(summary))?;
        loop {
            let answer = self.ask(
                "Apply these changes? [a]ccept all / [r]eview per file / [s]kip all / [q]uit: ",
            )?;
            match answer.as_deref() {
                None | Some("q") | Some("quit") => return Ok(Decision::Abort),
                Some("a") | Some("accept") => return Ok(Decision::AcceptAll),
                Some("r") | Some("review") => return Ok(Decision::ReviewPerFile),
                Some("s") | Some("skip") => return Ok(Decision::SkipAll),
                Some(other) => writeln!(self.output, "unrecognized answer '{other}'")?,
            }
        }
    }

    fn review_file(&mut self, file: &FileChanges, diff: &str) -> anyhow::Result<FileDecision> {
        write!(
            self.output,
            "{}{diff}{}",
            render_file_header(&file.path, file.edits.len()),
            render_edit_list(file)
        )?;
        loop {
            let answer = self.ask("Apply changes to this file? [y]es / [n]o / [e]dit: ")?;
            match answer.as_deref() {
                None | Some("n") | Some("no") => return Ok(FileDecision::Reject),
                Some("y") | Some("yes") => return Ok(FileDecision::Accept),
                Some("e") | Some("edit") => {
                    let Some(list) = self.ask("Edits to keep (e.g. 1,3): ")? else {
                        return Ok(FileDecision::Reject);
                    };
                    match parse_picks(&list, file.edits.len()) {
                        Ok(picks) => return Ok(FileDecision::Pick(picks)),
                        Err(msg) => writeln!(self.output, "{msg}")?,
                    }
                }
                Some(other) => writeln!(self.output, "unrecognized answer '{other}'")?,
            }
        }
    }

    fn confirm_commit(&mut self, message: &str) -> anyhow::Result<bool> {
        writeln!(self.output, "\n{message}")?;
        let answer = self.ask("Commit these changes? [y/N]: ")?;
        Ok(matches!(answer.as_deref(), Some("y") | Some("yes")))
    }
}

/// Parse a 1-based edit list like `1,3 4` into sorted 0-based indices.
fn parse_picks(list: &str, count: usize) -> Result<Vec<usize>, String> {
    let mut picks = Vec::new();
    for token in list.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let n: usize = token
            .parse()
            .map_err(|_| format!("'{token}' is not an edit number"))?;
        if n == 0 || n > count {
            return Err(format!("edit {n} is out of range 1..={count}"));
        }
        picks.push(n - 1);
    }
    picks.sort_unstable();
    picks.dedup();
    Ok(picks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use safefix_types::candidate::FixCategory;
    use safefix_types::change::Edit;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_git(root: &Utf8Path, args: &[&str]) {
        let out = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(args)
            .output()
            .expect("spawn git");
        assert!(
            out.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
    }

    fn git_repo() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        run_git(&root, &["init", "-q"]);
        run_git(&root, &["config", "user.email", "dev@example.com"]);
        run_git(&root, &["config", "user.name", "Dev"]);
        std::fs::write(root.join("a.js"), "console.log(1);\n").expect("write");
        run_git(&root, &["add", "a.js"]);
        run_git(&root, &["commit", "-q", "-m", "init"]);
        (temp, root)
    }

    #[test]
    fn status_outside_repository_is_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        assert_eq!(ShellGitPort.status(&root).expect("status"), None);
    }

    #[test]
    fn status_reports_branch_head_and_dirty_paths() {
        let (_temp, root) = git_repo();
        let clean = ShellGitPort.status(&root).expect("status").expect("repo");
        assert!(clean.dirty_paths.is_empty());
        assert!(clean.branch.is_some());
        assert_eq!(clean.head.as_deref().map(str::len), Some(40));

        std::fs::write(root.join("b.js"), "debugger;\n").expect("write");
        let dirty = ShellGitPort.status(&root).expect("status").expect("repo");
        assert_eq!(dirty.dirty_paths, vec!["b.js".to_string()]);
    }

    #[test]
    fn branch_reset_and_commit_round_through_git() {
        let (_temp, root) = git_repo();
        assert!(!ShellGitPort.branch_exists(&root, "safefix-backup-x").expect("exists"));
        ShellGitPort.create_branch(&root, "safefix-backup-x").expect("branch");
        assert!(ShellGitPort.branch_exists(&root, "safefix-backup-x").expect("exists"));

        std::fs::write(root.join("a.js"), "").expect("write");
        ShellGitPort.reset_hard(&root, "safefix-backup-x").expect("reset");
        assert_eq!(
            std::fs::read_to_string(root.join("a.js")).expect("read"),
            "console.log(1);\n"
        );

        std::fs::write(root.join("a.js"), "").expect("write");
        let sha = ShellGitPort
            .commit(&root, &[Utf8PathBuf::from("a.js")], "chore(safefix): remove 1 debug statement")
            .expect("commit");
        let status = ShellGitPort.status(&root).expect("status").expect("repo");
        assert_eq!(status.head.as_deref(), Some(sha.as_str()));
        assert!(status.dirty_paths.is_empty());
    }

    #[test]
    fn fs_write_port_creates_parents() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        let path = root.join("src/deep/a.js");
        FsWritePort.write_file(&path, b"x\n").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "x\n");
    }

    #[test]
    fn tail_buffer_keeps_the_end() {
        let mut buf = TailBuffer::new(4);
        buf.push(b"abc");
        buf.push(b"defg");
        let (text, truncated) = buf.render();
        assert!(truncated);
        assert_eq!(text, format!("{TRUNCATION_MARKER}defg"));
    }

    #[cfg(unix)]
    mod shell {
        use super::*;

        fn cwd() -> (TempDir, Utf8PathBuf) {
            let temp = TempDir::new().expect("temp dir");
            let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
            (temp, root)
        }

        #[test]
        fn captures_exit_code_and_output() {
            let (_t, root) = cwd();
            let out = ShellCommandRunner
                .run("echo out; echo err 1>&2; exit 3", &root, Duration::from_secs(10), 4096)
                .expect("run");
            assert!(!out.success);
            assert!(!out.timed_out);
            assert_eq!(out.exit_code, Some(3));
            assert!(out.output.contains("out"));
            assert!(out.output.contains("err"));
        }

        #[test]
        fn success_runs_in_cwd() {
            let (_t, root) = cwd();
            std::fs::write(root.join("marker.txt"), "").expect("write");
            let out = ShellCommandRunner
                .run("test -f marker.txt", &root, Duration::from_secs(10), 4096)
                .expect("run");
            assert!(out.success);
            assert_eq!(out.exit_code, Some(0));
        }

        #[test]
        fn long_output_keeps_tail() {
            let (_t, root) = cwd();
            let out = ShellCommandRunner
                .run("seq 1 5000", &root, Duration::from_secs(10), 64)
                .expect("run");
            assert!(out.truncated);
            assert!(out.output.starts_with(TRUNCATION_MARKER));
            assert!(out.output.trim_end().ends_with("5000"));
            assert!(!out.output.contains("\n1\n"));
        }

        #[test]
        fn timeout_kills_the_child() {
            let (_t, root) = cwd();
            let out = ShellCommandRunner
                .run("sleep 5", &root, Duration::from_millis(200), 4096)
                .expect("run");
            assert!(out.timed_out);
            assert!(!out.success);
            assert_eq!(out.exit_code, None);
            assert!(out.duration < Duration::from_secs(4));
        }

        #[test]
        fn timeout_kills_background_jobs_of_the_shell() {
            let (_t, root) = cwd();
            let out = ShellCommandRunner
                .run("(sleep 1; touch late.txt) & wait", &root, Duration::from_millis(200), 4096)
                .expect("run");
            assert!(out.timed_out);

            thread::sleep(Duration::from_millis(1500));
            assert!(
                !root.join("late.txt").exists(),
                "a process started by the check outlived its timeout"
            );
        }
    }

    fn file_with_two_edits() -> FileChanges {
        let path = Utf8Path::new("src/a.js");
        FileChanges {
            path: path.to_path_buf(),
            edits: vec![
                Edit::remove(path, 2, "console.log(1);", FixCategory::ConsoleLogs, "remove one"),
                Edit::remove(path, 5, "debugger;", FixCategory::DebuggerStatements, "remove two"),
            ],
        }
    }

    #[test]
    fn terminal_decide_reprompts_until_valid() {
        let mut t = TerminalDecisions::new(Cursor::new("x\nr\n"), Vec::new());
        let decision = t.decide(&ChangeSummary::default(), "DIFF\n").expect("decide");
        assert_eq!(decision, Decision::ReviewPerFile);
        let shown = String::from_utf8(t.into_output()).expect("utf8");
        assert!(shown.contains("DIFF"));
        assert!(shown.contains("unrecognized answer 'x'"));
        assert_eq!(shown.matches("[a]ccept all").count(), 2);
    }

    #[test]
    fn terminal_eof_is_conservative() {
        let mut t = TerminalDecisions::new(Cursor::new(""), Vec::new());
        assert_eq!(t.decide(&ChangeSummary::default(), "").expect("decide"), Decision::Abort);
        assert_eq!(
            t.review_file(&file_with_two_edits(), "").expect("review"),
            FileDecision::Reject
        );
        assert!(!t.confirm_commit("msg").expect("confirm"));
    }

    #[test]
    fn terminal_edit_picks_edits() {
        let mut t = TerminalDecisions::new(Cursor::new("e\n3\n2\n"), Vec::new());
        let answer = t.review_file(&file_with_two_edits(), "").expect("review");
        assert_eq!(answer, FileDecision::Pick(vec![1]));
        let shown = String::from_utf8(t.into_output()).expect("utf8");
        assert!(shown.contains("== src/a.js (2 edits)"));
        assert!(shown.contains("edit 3 is out of range 1..=2"));
    }

    #[test]
    fn terminal_commit_defaults_to_no() {
        let mut t = TerminalDecisions::new(Cursor::new("\n"), Vec::new());
        assert!(!t.confirm_commit("msg").expect("confirm"));
        let mut t = TerminalDecisions::new(Cursor::new("Y\n"), Vec::new());
        assert!(t.confirm_commit("msg").expect("confirm"));
    }

    #[test]
    fn parse_picks_sorts_and_dedups() {
        assert_eq!(parse_picks("3, 1 3", 3), Ok(vec![0, 2]));
        assert!(parse_picks("0", 3).is_err());
        assert!(parse_picks("a", 3).is_err());
        assert_eq!(parse_picks("", 3), Ok(vec![]));
    }

    #[test]
    fn scripted_decisions_fall_back_when_exhausted() {
        let mut s = ScriptedDecisions::new(Decision::ReviewPerFile).with_file(FileDecision::Accept);
        let decision = s.decide(&ChangeSummary::default(), "").expect("decide");
        assert_eq!(decision, Decision::ReviewPerFile);
        assert_eq!(s.decide(&ChangeSummary::default(), "").expect("decide"), Decision::Abort);
        let f = file_with_two_edits();
        assert_eq!(s.review_file(&f, "").expect("review"), FileDecision::Accept);
        assert_eq!(s.review_file(&f, "").expect("review"), FileDecision::Reject);
        assert_eq!(s.reviewed.len(), 2);
    }
}
