//! `linux-setup` binary: parse arguments, set up logging, run a subcommand.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use linux_setup_cli::cli::{Cli, Command};
use linux_setup_cli::commands;
use linux_setup_cli::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let command = args.command.unwrap_or_default();

    logging::init_subscriber(args.verbose, command.log_name());
    let log = Arc::new(Logger::new(command.log_name()));

    match command {
        Command::Run(opts) => commands::run::run(&args.global, &opts, log),
        Command::Detect(opts) => commands::detect::run(&args.global, &opts, log),
        Command::ListPresets(opts) => commands::list::run(&opts, &log),
        Command::Backup => commands::backup::run(&args.global, log),
        Command::Restore(opts) => commands::backup::restore(&args.global, &opts, log),
        Command::Completions(opts) => {
            commands::completions::run(&opts);
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
