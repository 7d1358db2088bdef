//! Ordered stage execution with per-stage failure policy.
//!
//! The pipeline is a linear state machine: each stage runs to completion
//! before the next begins, each action runs to completion before the next
//! in its stage. A stage either tolerates action failures (optional
//! package installs) or aborts the whole run on the first one (source
//! builds, where a half-built dependency poisons everything downstream).
//! There is no rollback; the run is fail-forward and the operator
//! remediates from the recorded outcomes.

use anyhow::Result;
use serde::Serialize;

use crate::config::InstallConfig;
use crate::executor::{self, CommandFailure, ShellCommand};
use crate::libfix::{self, RepairSpec};

/// What a stage does when one of its actions fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and proceed to the next action; the stage always
    /// completes. Used for package installs where a missing name variant
    /// must not halt provisioning.
    ContinueOnError,
    /// Fail the stage on the first action failure and abort the pipeline;
    /// no later stage runs.
    AbortOnError,
}

/// One unit of work inside a stage.
#[derive(Debug, Clone)]
pub enum Action {
    /// Run a discrete shell command.
    Run(ShellCommand),
    /// Repair versioned shared-library names before a build that links
    /// against the canonical ones.
    RepairSharedLibraries(RepairSpec),
}

impl Action {
    /// Human-readable label used in progress output and the run report.
    pub fn label(&self) -> String {
        match self {
            Action::Run(cmd) => cmd.script.clone(),
            Action::RepairSharedLibraries(spec) => format!(
                "repair {}* shared-library links in {}",
                spec.prefix,
                spec.lib_dir.display()
            ),
        }
    }
}

/// An ordered phase of the provisioning pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub policy: FailurePolicy,
    pub actions: Vec<Action>,
}

/// Outcome of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Succeeded,
    Failed {
        error: String,
        exit_code: Option<i32>,
    },
    /// Never started because an earlier action aborted the stage.
    Skipped,
}

/// One action's label and outcome, for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: String,
    pub status: ActionStatus,
}

/// Terminal state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
    Skipped,
}

/// Everything that happened inside one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: &'static str,
    pub policy: FailurePolicy,
    pub status: StageStatus,
    pub outcomes: Vec<ActionOutcome>,
}

/// Terminal state of the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    AllCompleted,
    AbortedAt(String),
}

/// Run every stage in order, applying each stage's failure policy.
///
/// Always returns the per-stage reports, including on abort: the caller
/// decides the process exit from the [`PipelineOutcome`] and persists the
/// reports either way.
pub fn run(stages: &[Stage], config: &InstallConfig) -> (Vec<StageReport>, PipelineOutcome) {
    let mut reports = Vec::with_capacity(stages.len());
    let mut aborted_at: Option<String> = None;

    for stage in stages {
        if aborted_at.is_some() {
            reports.push(StageReport {
                name: stage.name,
                policy: stage.policy,
                status: StageStatus::Skipped,
                outcomes: Vec::new(),
            });
            continue;
        }

        println!(
            "[stage:{}] starting ({} actions)",
            stage.name,
            stage.actions.len()
        );
        reports.push(run_stage(stage, config, &mut aborted_at));
    }

    let outcome = match aborted_at {
        Some(name) => PipelineOutcome::AbortedAt(name),
        None => PipelineOutcome::AllCompleted,
    };
    (reports, outcome)
}

fn run_stage(
    stage: &Stage,
    config: &InstallConfig,
    aborted_at: &mut Option<String>,
) -> StageReport {
    let mut outcomes = Vec::with_capacity(stage.actions.len());
    let mut failed = false;

    for action in &stage.actions {
        if failed && stage.policy == FailurePolicy::AbortOnError {
            outcomes.push(ActionOutcome {
                action: action.label(),
                status: ActionStatus::Skipped,
            });
            continue;
        }

        println!("[stage:{}] {}", stage.name, action.label());
        match execute(action, config) {
            Ok(()) => outcomes.push(ActionOutcome {
                action: action.label(),
                status: ActionStatus::Succeeded,
            }),
            Err(err) => {
                let exit_code = err.downcast_ref::<CommandFailure>().and_then(|f| f.code);
                outcomes.push(ActionOutcome {
                    action: action.label(),
                    status: ActionStatus::Failed {
                        error: format!("{err:#}"),
                        exit_code,
                    },
                });
                match stage.policy {
                    FailurePolicy::ContinueOnError => {
                        eprintln!("[stage:{}] continuing past failure: {err:#}", stage.name);
                    }
                    FailurePolicy::AbortOnError => {
                        eprintln!("[stage:{}] aborting pipeline: {err:#}", stage.name);
                        failed = true;
                    }
                }
            }
        }
    }

    if failed {
        *aborted_at = Some(stage.name.to_string());
        StageReport {
            name: stage.name,
            policy: stage.policy,
            status: StageStatus::Failed,
            outcomes,
        }
    } else {
        StageReport {
            name: stage.name,
            policy: stage.policy,
            status: StageStatus::Completed,
            outcomes,
        }
    }
}

fn execute(action: &Action, config: &InstallConfig) -> Result<()> {
    match action {
        Action::Run(cmd) => {
            executor::run(cmd, config)?;
            Ok(())
        }
        Action::RepairSharedLibraries(spec) => {
            libfix::repair_library_links(spec)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> InstallConfig {
        InstallConfig {
            install_dir: dir.path().to_path_buf(),
            cores: 1,
        }
    }

    fn touch_cmd(dir: &TempDir, name: &str) -> Action {
        Action::Run(ShellCommand::new(format!(
            "touch {}",
            dir.path().join(name).display()
        )))
    }

    fn fail_cmd() -> Action {
        Action::Run(ShellCommand::new("exit 7"))
    }

    #[test]
    fn test_continue_on_error_completes_and_applies_successes() {
        let temp = TempDir::new().unwrap();
        let stage = Stage {
            name: "packages",
            policy: FailurePolicy::ContinueOnError,
            actions: vec![touch_cmd(&temp, "a"), fail_cmd(), touch_cmd(&temp, "b")],
        };

        let (reports, outcome) = run(&[stage], &test_config(&temp));

        assert_eq!(outcome, PipelineOutcome::AllCompleted);
        assert_eq!(reports[0].status, StageStatus::Completed);
        assert!(temp.path().join("a").exists());
        assert!(temp.path().join("b").exists());
        assert!(matches!(
            reports[0].outcomes[1].status,
            ActionStatus::Failed {
                exit_code: Some(7),
                ..
            }
        ));
    }

    #[test]
    fn test_abort_on_error_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let stage = Stage {
            name: "build",
            policy: FailurePolicy::AbortOnError,
            actions: vec![touch_cmd(&temp, "a"), fail_cmd(), touch_cmd(&temp, "b")],
        };

        let (reports, outcome) = run(&[stage], &test_config(&temp));

        assert_eq!(outcome, PipelineOutcome::AbortedAt("build".to_string()));
        assert_eq!(reports[0].status, StageStatus::Failed);
        assert!(temp.path().join("a").exists());
        assert!(!temp.path().join("b").exists());
        assert_eq!(reports[0].outcomes[2].status, ActionStatus::Skipped);
    }

    #[test]
    fn test_abort_skips_every_later_stage() {
        let temp = TempDir::new().unwrap();
        let stages = vec![
            Stage {
                name: "first",
                policy: FailurePolicy::AbortOnError,
                actions: vec![fail_cmd()],
            },
            Stage {
                name: "second",
                policy: FailurePolicy::AbortOnError,
                actions: vec![touch_cmd(&temp, "never")],
            },
        ];

        let (reports, outcome) = run(&stages, &test_config(&temp));

        assert_eq!(outcome, PipelineOutcome::AbortedAt("first".to_string()));
        assert_eq!(reports[1].status, StageStatus::Skipped);
        assert!(reports[1].outcomes.is_empty());
        assert!(!temp.path().join("never").exists());
    }

    #[test]
    fn test_empty_pipeline_completes() {
        let temp = TempDir::new().unwrap();
        let (reports, outcome) = run(&[], &test_config(&temp));
        assert!(reports.is_empty());
        assert_eq!(outcome, PipelineOutcome::AllCompleted);
    }

    #[test]
    fn test_repair_action_runs_inside_a_stage() {
        let temp = TempDir::new().unwrap();
        let lib_dir = temp.path().join("lib");
        fs::create_dir(&lib_dir).unwrap();
        fs::write(lib_dir.join("libfoo.so.1.2.3"), b"").unwrap();

        let stage = Stage {
            name: "uhd",
            policy: FailurePolicy::AbortOnError,
            actions: vec![Action::RepairSharedLibraries(RepairSpec {
                lib_dir: lib_dir.clone(),
                prefix: "lib".to_string(),
                family: crate::packages::PackageFamily::Apt,
                python_minor: Some(7),
            })],
        };

        let (reports, outcome) = run(&[stage], &test_config(&temp));

        assert_eq!(outcome, PipelineOutcome::AllCompleted);
        assert_eq!(reports[0].status, StageStatus::Completed);
        assert!(fs::read_link(lib_dir.join("libfoo.so")).is_ok());
    }
}
