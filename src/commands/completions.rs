//! Command: generate shell completion scripts.
use clap::CommandFactory as _;

use crate::cli::{Cli, CompletionsOpts};

/// Write the completion script for the requested shell to stdout.
pub fn run(opts: &CompletionsOpts) {
    let mut command = Cli::command();
    clap_complete::generate(opts.shell, &mut command, "linux-setup", &mut std::io::stdout());
}
