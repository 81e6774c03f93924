//! Post-apply validation suite.
//!
//! Checks run sequentially, each under its own timeout. Every configured
//! check runs; a failure never stops the ones after it.

use crate::ports::CommandRunner;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use safefix_types::config::ValidationConfig;
use safefix_types::validation::{CheckOutcome, CheckStatus, ValidationOutcome};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// npm writes this into `scripts.test` for a fresh package.
const NPM_PLACEHOLDER_TEST: &str = "no test specified";

/// One check resolved to a command, or to the reason it will be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCheck {
    pub name: String,
    pub command: Result<String, String>,
}

pub struct Validator<'a> {
    runner: &'a dyn CommandRunner,
    project_root: Utf8PathBuf,
    config: ValidationConfig,
}

impl<'a> Validator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        project_root: &Utf8Path,
        config: &ValidationConfig,
    ) -> Self {
        Self {
            runner,
            project_root: project_root.to_path_buf(),
            config: config.clone(),
        }
    }

    /// Resolve each enabled check to a command, consulting `package.json`
    /// scripts for built-in checks left unset.
    pub fn plan(&self) -> Vec<PlannedCheck> {
        let scripts = match load_scripts(&self.project_root) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read package.json scripts");
                BTreeMap::new()
            }
        };

        let builtin: [(&str, bool, &Option<String>, &[&str]); 3] = [
            ("test", self.config.run_tests, &self.config.test_command, &["test"]),
            (
                "typecheck",
                self.config.run_type_check,
                &self.config.type_check_command,
                &["typecheck", "type-check", "tsc"],
            ),
            ("lint", self.config.run_linter, &self.config.lint_command, &["lint"]),
        ];

        let mut out = Vec::new();
        for (name, enabled, configured, script_names) in builtin {
            if !enabled {
                continue;
            }
            let command = match configured {
                Some(cmd) if !cmd.trim().is_empty() => Ok(cmd.clone()),
                _ => discover(&scripts, script_names)
                    .ok_or_else(|| {
                        format!("no {name} command configured or found in package.json")
                    }),
            };
            out.push(PlannedCheck {
                name: name.to_string(),
                command,
            });
        }
        for custom in &self.config.custom_commands {
            out.push(PlannedCheck {
                name: custom.name.clone(),
                command: Ok(custom.command.clone()),
            });
        }
        out
    }

    pub fn run(&self) -> ValidationOutcome {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut checks = Vec::new();
        for planned in self.plan() {
            let outcome = match planned.command {
                Err(reason) => {
                    debug!(check = %planned.name, %reason, "check skipped");
                    CheckOutcome::skipped(planned.name, reason)
                }
                Ok(command) => self.run_one(planned.name, command, timeout),
            };
            checks.push(outcome);
        }
        let outcome = ValidationOutcome::from_checks(checks);
        info!(
            success = outcome.success,
            failed = outcome.failures().count(),
            "validation finished"
        );
        outcome
    }

    fn run_one(&self, name: String, command: String, timeout: Duration) -> CheckOutcome {
        info!(check = %name, %command, "running check");
        match self
            .runner
            .run(&command, &self.project_root, timeout, self.config.max_output_bytes)
        {
            Ok(out) => {
                if out.timed_out {
                    warn!(check = %name, timeout_secs = timeout.as_secs(), "check timed out");
                }
                CheckOutcome {
                    name,
                    command: Some(command),
                    status: if out.success {
                        CheckStatus::Passed
                    } else {
                        CheckStatus::Failed
                    },
                    exit_code: out.exit_code,
                    timed_out: out.timed_out,
                    output: out.output,
                    truncated: out.truncated,
                    duration_ms: u64::try_from(out.duration.as_millis()).unwrap_or(u64::MAX),
                }
            }
            Err(e) => {
                warn!(check = %name, error = %format!("{e:#}"), "check could not start");
                CheckOutcome {
                    name,
                    command: Some(command),
                    status: CheckStatus::Failed,
                    exit_code: None,
                    timed_out: false,
                    output: format!("{e:#}"),
                    truncated: false,
                    duration_ms: 0,
                }
            }
        }
    }
}

fn load_scripts(root: &Utf8Path) -> anyhow::Result<BTreeMap<String, String>> {
    let path = root.join("package.json");
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    let text = fs_err::read_to_string(&path)?;
    let manifest: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path))?;
    let scripts = manifest
        .get("scripts")
        .and_then(|s| s.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();
    Ok(scripts)
}

fn discover(scripts: &BTreeMap<String, String>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        let body = scripts.get(*name)?;
        if body.trim().is_empty() || body.contains(NPM_PLACEHOLDER_TEST) {
            return None;
        }
        Some(format!("npm run {name}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CommandOutput;
    use safefix_types::config::CustomCommand;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Recorder {
        calls: RefCell<Vec<String>>,
        fail: &'static str,
    }

    impl CommandRunner for Recorder {
        fn run(
            &self,
            command: &str,
            _: &Utf8Path,
            _: Duration,
            _: usize,
        ) -> anyhow::Result<CommandOutput> {
            self.calls.borrow_mut().push(command.to_string());
            let ok = command != self.fail;
            Ok(CommandOutput {
                exit_code: Some(if ok { 0 } else { 1 }),
                success: ok,
                timed_out: false,
                output: if ok { String::new() } else { "boom".into() },
                truncated: false,
                duration: Duration::from_millis(5),
            })
        }
    }

    fn project(package_json: Option<&str>) -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        if let Some(text) = package_json {
            std::fs::write(root.join("package.json"), text).unwrap();
        }
        (temp, root)
    }

    #[test]
    fn discovers_scripts_and_skips_placeholder() {
        let (_t, root) = project(Some(
            r#"{"scripts": {
                "test": "echo \"Error: no test specified\" && exit 1",
                "type-check": "tsc --noEmit",
                "lint": "eslint ."
            }}"#,
        ));
        let runner = Recorder { calls: RefCell::default(), fail: "" };
        let plan = Validator::new(&runner, &root, &ValidationConfig::default()).plan();
        assert_eq!(plan.len(), 3);
        assert!(plan[0].command.is_err());
        assert_eq!(plan[1].command, Ok("npm run type-check".to_string()));
        assert_eq!(plan[2].command, Ok("npm run lint".to_string()));
    }

    #[test]
    fn configured_command_wins_over_discovery() {
        let (_t, root) = project(Some(r#"{"scripts": {"lint": "eslint ."}}"#));
        let runner = Recorder { calls: RefCell::default(), fail: "" };
        let config = ValidationConfig {
            run_tests: false,
            run_type_check: false,
            lint_command: Some("biome check".into()),
            ..ValidationConfig::default()
        };
        let plan = Validator::new(&runner, &root, &config).plan();
        assert_eq!(
            plan,
            vec![PlannedCheck {
                name: "lint".into(),
                command: Ok("biome check".into())
            }]
        );
    }

    #[test]
    fn every_check_runs_after_a_failure() {
        let (_t, root) = project(None);
        let runner = Recorder { calls: RefCell::default(), fail: "check-b" };
        let config = ValidationConfig {
            custom_commands: ["a", "b", "c"]
                .iter()
                .map(|n| CustomCommand { name: (*n).into(), command: format!("check-{n}") })
                .collect(),
            ..ValidationConfig::disabled()
        };
        let outcome = Validator::new(&runner, &root, &config).run();
        assert!(!outcome.success);
        assert_eq!(outcome.checks.len(), 3);
        assert_eq!(*runner.calls.borrow(), vec!["check-a", "check-b", "check-c"]);
        assert_eq!(outcome.failures().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(outcome.checks[1].output, "boom");
    }

    #[test]
    fn missing_commands_are_skipped_not_failed() {
        let (_t, root) = project(None);
        let runner = Recorder { calls: RefCell::default(), fail: "" };
        let outcome = Validator::new(&runner, &root, &ValidationConfig::default()).run();
        assert!(outcome.success);
        assert!(!outcome.ran_any());
        assert_eq!(outcome.checks.len(), 3);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn malformed_package_json_degrades_to_skip() {
        let (_t, root) = project(Some("{not json"));
        let runner = Recorder { calls: RefCell::default(), fail: "" };
        let outcome = Validator::new(&runner, &root, &ValidationConfig::default()).run();
        assert!(outcome.success);
        assert!(outcome.checks.iter().all(|c| c.status == CheckStatus::Skipped));
    }
}
