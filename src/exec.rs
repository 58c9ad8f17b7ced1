//! Process execution behind the [`Executor`] trait.
//!
//! Every interaction with the host (task commands, `systemctl`, `cp`, `ping`,
//! `df`, `uname`) goes through an [`Executor`] so that engine logic can be
//! exercised in tests without spawning real processes.

use anyhow::{Context as _, Result, bail};
use std::process::{Command, Output, Stdio};

/// Result of a command execution with captured output.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Exit status of a process that ran with inherited standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

/// Abstraction over process spawning.
///
/// [`SystemExecutor`] is the production implementation; unit tests use the
/// generated `MockExecutor`.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    /// Run a command with captured output, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or exits non-zero.
    fn run<'a>(&self, program: &str, args: &[&'a str]) -> Result<ExecResult>;

    /// Run a command with captured output, returning the result even when
    /// the process exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    fn run_unchecked<'a>(&self, program: &str, args: &[&'a str]) -> Result<ExecResult>;

    /// Run a command attached to the caller's stdin, stdout and stderr.
    ///
    /// Output is not captured, so interactive programs (e.g. a `sudo`
    /// password prompt) behave as if run directly from the terminal.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the process cannot be started.
    fn run_interactive<'a>(&self, program: &str, args: &[&'a str]) -> std::io::Result<ProcessExit>;
}

/// [`Executor`] that spawns real processes with [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.run_unchecked(program, args)?;
        if !result.success {
            bail!(
                "{program} failed (exit {}): {}",
                result.code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> std::io::Result<ProcessExit> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(ProcessExit {
            success: status.success(),
            code: status.code(),
        })
    }
}
