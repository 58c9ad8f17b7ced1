//! Command: detect the environment and run the matching preset.
use std::sync::Arc;

use anyhow::{Result, bail};

use super::{CommandSetup, resolve_preset};
use crate::cli::{GlobalOpts, RunOpts};
use crate::coordinator::{RunCoordinator, RunReport};
use crate::error::SetupError;
use crate::interaction::{FixedAnswer, Interaction, Prompt};
use crate::logging::Logger;
use crate::tasks::{ExecutionMode, Preset};

/// Run the setup flow.
///
/// # Errors
///
/// Returns an error if setup cannot start (preset, prerequisites, backup
/// root) or if any task failed or the run was aborted.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(log)?;
    let interaction: Box<dyn Interaction> = if global.yes {
        Box::new(FixedAnswer::always_continue())
    } else {
        Box::new(Prompt::stdio())
    };
    run_with(&setup, global, opts, interaction.as_ref())
}

/// Setup flow against an already-built [`CommandSetup`].
///
/// # Errors
///
/// See [`run`].
pub fn run_with(
    setup: &CommandSetup,
    global: &GlobalOpts,
    opts: &RunOpts,
    interaction: &dyn Interaction,
) -> Result<()> {
    let log = &setup.log;
    let ctx = &setup.ctx;
    let mode = ExecutionMode::from_dry_run(global.dry_run);

    log.info(&format!("linux-setup {}", super::version::version()));
    log.stage("Detecting environment");
    let env = setup.detect_environment();
    for line in env.to_string().lines() {
        log.info(line);
    }

    let preset = resolve_preset(global, &env)?;
    describe_preset(log, &preset);

    if !global.yes && !mode.is_dry_run() && !interaction.confirm_run(&preset) {
        log.info("Setup cancelled");
        return Ok(());
    }

    let coordinator = RunCoordinator::new(ctx, interaction);
    prepare(setup, global, opts, &coordinator, mode)?;

    let report = coordinator.run(&preset, mode);
    log.print_summary();
    check_report(&report)
}

/// Health checks and backup, in that order, before the first task.
fn prepare(
    setup: &CommandSetup,
    global: &GlobalOpts,
    opts: &RunOpts,
    coordinator: &RunCoordinator<'_>,
    mode: ExecutionMode,
) -> Result<(), SetupError> {
    let log = &setup.log;
    if opts.skip_checks || mode.is_dry_run() {
        log.debug("skipping prerequisite checks");
    } else {
        coordinator.validate_prerequisites(&setup.prerequisites())?;
    }

    if opts.no_backup {
        log.debug("skipping backup (--no-backup)");
    } else {
        log.stage("Backing up system files");
        setup.backup_manager(global).create_backup(&setup.ctx, mode)?;
    }
    Ok(())
}

fn describe_preset(log: &Logger, preset: &Preset) {
    log.stage(&format!("Preset: {}", preset.name));
    log.info(&format!("Environment: {}", preset.environment));
    if !preset.description.is_empty() {
        log.info(&preset.description);
    }
    for (i, task) in preset.tasks.iter().enumerate() {
        let mut flags = String::new();
        if task.elevated {
            flags.push_str(" [sudo]");
        }
        if task.optional {
            flags.push_str(" (optional)");
        }
        log.info(&format!("{}. {}{flags}", i + 1, task.name));
    }
}

fn check_report(report: &RunReport) -> Result<()> {
    if report.aborted {
        bail!(
            "run aborted: {} of {} task(s) skipped, {} failed",
            report.skipped(),
            report.total,
            report.failed
        );
    }
    if report.failed > 0 {
        bail!("{} task(s) failed", report.failed);
    }
    Ok(())
}
