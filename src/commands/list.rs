//! Command: list every catalogue preset.
use anyhow::Result;

use crate::catalogue;
use crate::cli::OutputOpts;
use crate::logging::Logger;

/// Print every preset with its tasks.
///
/// # Errors
///
/// Returns an error if an embedded preset fails to parse.
#[allow(clippy::print_stdout)]
pub fn run(opts: &OutputOpts, log: &Logger) -> Result<()> {
    let presets = catalogue::all_presets()?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    log.stage("Available presets");
    for preset in &presets {
        log.info(&format!("\x1b[32m▶ {}\x1b[0m", preset.name));
        log.info(&format!("  Environment: {}", preset.environment));
        log.info(&format!("  Description: {}", preset.description));
        log.info(&format!("  Tasks: {}", preset.tasks.len()));
        for (i, task) in preset.tasks.iter().enumerate() {
            log.info(&format!("    {}. {} ({})", i + 1, task.name, task.kind.label()));
        }
    }
    Ok(())
}
