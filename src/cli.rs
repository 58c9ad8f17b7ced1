//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the Linux setup engine.
#[derive(Parser, Debug)]
#[command(
    name = "linux-setup",
    about = "Environment-aware Linux setup engine",
    version
)]
pub struct Cli {
    /// Subcommand to run (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every prompt and continue after failed tasks
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Use a preset TOML file instead of the detected preset
    #[arg(short, long, global = true, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Override the backup directory
    #[arg(long, global = true, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the environment and run the matching preset
    Run(RunOpts),
    /// Print the detected environment
    Detect(OutputOpts),
    /// List every available preset and its tasks
    ListPresets(OutputOpts),
    /// Back up sensitive system files now
    Backup,
    /// Find backups taken at a given timestamp
    Restore(RestoreOpts),
    /// Generate shell completion scripts
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Default for Command {
    fn default() -> Self {
        Self::Run(RunOpts::default())
    }
}

impl Command {
    /// Name used for this command's log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Detect(_) => "detect",
            Self::ListPresets(_) => "list-presets",
            Self::Backup => "backup",
            Self::Restore(_) => "restore",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunOpts {
    /// Skip the connectivity and disk checks
    #[arg(long)]
    pub skip_checks: bool,

    /// Do not back up system files before running
    #[arg(long)]
    pub no_backup: bool,
}

/// Output format options for read-only subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct OutputOpts {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Options for the `restore` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RestoreOpts {
    /// Timestamp (or any part of a backup file name) to look for
    pub timestamp: String,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
