//! Command: print the detected environment.
use std::sync::Arc;

use anyhow::Result;

use super::{CommandSetup, resolve_preset};
use crate::cli::{GlobalOpts, OutputOpts};
use crate::logging::Logger;

/// Detect the environment and print it with the preset it selects.
///
/// # Errors
///
/// Returns an error if setup fails or JSON serialization fails.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &OutputOpts, log: Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(log)?;
    let env = setup.detect_environment();

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&env)?);
        return Ok(());
    }

    setup.log.stage("Environment");
    for line in env.to_string().lines() {
        setup.log.info(line);
    }
    let preset = resolve_preset(global, &env)?;
    setup.log.info(&format!("Selected preset: {}", preset.name));
    Ok(())
}
