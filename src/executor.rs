//! Shell command execution.
//!
//! Stages are lists of discrete command records rather than one
//! `;`-concatenated shell block, so a failure is attributed to the exact
//! command that produced it. Each record runs to completion through
//! `sh -c` with the run configuration exported as `IDIR` and `CORES`;
//! stdout is captured and returned, stderr is inherited so build output
//! stays visible on the console.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::InstallConfig;

/// A command exited non-zero. Whether this is fatal depends on the
/// enclosing stage's failure policy, not on the executor.
#[derive(Debug, Error)]
#[error("command `{command}` failed with exit code {}", .code.map_or_else(|| "unknown (terminated by signal)".to_string(), |c| c.to_string()))]
pub struct CommandFailure {
    pub command: String,
    pub code: Option<i32>,
}

/// One discrete shell command with an optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub script: String,
    pub cwd: Option<PathBuf>,
}

impl ShellCommand {
    /// Command run from the invoking process's working directory.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            cwd: None,
        }
    }

    /// Command run from a specific directory.
    pub fn in_dir(script: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            cwd: Some(cwd.into()),
        }
    }
}

/// Run one command to completion and return its captured stdout.
///
/// Never retries. A non-zero exit becomes a [`CommandFailure`] carrying
/// the command text and exit code.
pub fn run(command: &ShellCommand, config: &InstallConfig) -> Result<String> {
    let mut child = Command::new("sh");
    child
        .arg("-c")
        .arg(&command.script)
        .env("IDIR", &config.install_dir)
        .env("CORES", config.cores.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    if let Some(cwd) = &command.cwd {
        child.current_dir(cwd);
    }

    let output = child
        .output()
        .with_context(|| format!("spawning shell for `{}`", command.script))?;

    if !output.status.success() {
        return Err(CommandFailure {
            command: command.script.clone(),
            code: output.status.code(),
        }
        .into());
    }

    String::from_utf8(output.stdout)
        .with_context(|| format!("decoding output of `{}`", command.script))
}
