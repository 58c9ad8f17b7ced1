//! Commands: create a backup now, and find existing backups.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, RestoreOpts};
use crate::logging::Logger;
use crate::tasks::ExecutionMode;

/// Back up the standard sources.
///
/// # Errors
///
/// Returns an error if the backup root cannot be created.
pub fn run(global: &GlobalOpts, log: Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(log)?;
    let manager = setup.backup_manager(global);
    setup.log.stage("Backing up system files");
    let report = manager.create_backup(&setup.ctx, ExecutionMode::from_dry_run(global.dry_run))?;
    if !report.warnings.is_empty() {
        setup
            .log
            .warn(&format!("{} file(s) could not be backed up cleanly", report.warnings.len()));
    }
    Ok(())
}

/// List backups whose name contains `opts.timestamp`.
///
/// Nothing is copied back; restoring is left to the user.
///
/// # Errors
///
/// Returns an error if the backup directory cannot be read.
pub fn restore(global: &GlobalOpts, opts: &RestoreOpts, log: Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(log)?;
    let manager = setup.backup_manager(global);
    setup.log.stage(&format!("Searching backups in {}", manager.root().display()));
    let found = manager.restore_backup(&setup.ctx, &opts.timestamp)?;
    if !found.is_empty() {
        setup.log.info(&format!(
            "{} backup(s) found; copy them back manually to restore",
            found.len()
        ));
    }
    Ok(())
}
