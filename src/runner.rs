//! Command runner: execute one whitespace-tokenized command line with
//! inherited standard streams, timing it and mapping its exit status.
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::TaskError;
use crate::logging::format_duration;
use crate::tasks::Context;

/// Run `command_line` once through the context's executor.
///
/// The line is split on whitespace with no quoting rules; the first token is
/// the program. Standard streams are inherited so interactive prompts (for
/// example `sudo`) reach the terminal.
///
/// # Errors
///
/// - [`TaskError::EmptyCommand`] if the line has no tokens.
/// - [`TaskError::Spawn`] if the program cannot be started.
/// - [`TaskError::CommandFailed`] if it exits non-zero or is killed.
pub fn run(ctx: &Context, command_line: &str) -> Result<Duration, TaskError> {
    let mut tokens = command_line.split_whitespace();
    let program = tokens.next().ok_or(TaskError::EmptyCommand)?;
    let args: Vec<&str> = tokens.collect();
    spawn(ctx, command_line.trim(), program, &args)
}

/// Run an executable file (such as a generated script) with no arguments.
///
/// The path is passed as a single program token, so it may contain
/// whitespace.
///
/// # Errors
///
/// Same as [`run`], minus [`TaskError::EmptyCommand`].
pub fn run_path(ctx: &Context, path: &Path) -> Result<Duration, TaskError> {
    let program = path.to_string_lossy();
    spawn(ctx, &program, &program, &[])
}

fn spawn(ctx: &Context, display: &str, program: &str, args: &[&str]) -> Result<Duration, TaskError> {
    ctx.log.info(&format!("Running: {display}"));
    let start = Instant::now();
    let exit = ctx
        .executor
        .run_interactive(program, args)
        .map_err(|source| TaskError::Spawn {
            command: display.to_string(),
            source,
        })?;
    let elapsed = start.elapsed();

    if exit.success {
        ctx.log
            .info(&format!("✓ Completed in {}", format_duration(elapsed)));
        Ok(elapsed)
    } else {
        ctx.log
            .error(&format!("✗ Failed in {}", format_duration(elapsed)));
        Err(TaskError::CommandFailed {
            command: display.to_string(),
            code: exit.code,
        })
    }
}
