//! Top-level subcommand orchestration.
pub mod backup;
pub mod completions;
pub mod detect;
pub mod list;
pub mod run;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::backup::BackupManager;
use crate::catalogue;
use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::coordinator::Prerequisites;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::platform::Environment;
use crate::tasks::{Context, Preset};

/// Shared state produced by the common command setup sequence.
///
/// Builds the task context around the real executor and loads the user
/// settings so each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Logger used for output and the run summary.
    pub log: Arc<Logger>,
    /// Execution context handed to the engine.
    pub ctx: Context,
    /// Settings from the optional config file.
    pub settings: Settings,
}

impl CommandSetup {
    /// Build the context with the system executor and load settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is unset or the settings file is invalid.
    pub fn init(log: Arc<Logger>) -> Result<Self> {
        Self::with_executor(log, Arc::new(SystemExecutor))
    }

    /// Same as [`init`](Self::init) with an explicit executor.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is unset or the settings file is invalid.
    pub fn with_executor(log: Arc<Logger>, executor: Arc<dyn Executor>) -> Result<Self> {
        let ctx = Context::new(Arc::clone(&log) as Arc<dyn Log>, executor)?;
        let settings = Settings::load(&ctx.home).context("loading settings")?;
        log.debug(&format!("settings: {settings:?}"));
        Ok(Self { log, ctx, settings })
    }

    /// Backup root: `--backup-dir`, then the settings file, then the default.
    #[must_use]
    pub fn backup_root(&self, global: &GlobalOpts) -> PathBuf {
        global
            .backup_dir
            .clone()
            .or_else(|| self.settings.backup_dir.clone())
            .unwrap_or_else(|| BackupManager::default_root(&self.ctx.home))
    }

    /// Backup manager for the standard sources under [`backup_root`](Self::backup_root).
    #[must_use]
    pub fn backup_manager(&self, global: &GlobalOpts) -> BackupManager {
        BackupManager::new(self.backup_root(global), &self.ctx.home)
    }

    /// Health-check targets from the settings.
    #[must_use]
    pub fn prerequisites(&self) -> Prerequisites {
        Prerequisites::from(&self.settings)
    }

    /// Probe the host through the context's executor.
    #[must_use]
    pub fn detect_environment(&self) -> Environment {
        Environment::detect(self.ctx.executor.as_ref())
    }
}

/// The preset for this run: `--preset <file>` if given, otherwise the
/// catalogue's match for `env`.
///
/// # Errors
///
/// Returns an error if the preset file cannot be loaded or parsed.
pub fn resolve_preset(global: &GlobalOpts, env: &Environment) -> Result<Preset> {
    let preset = match &global.preset {
        Some(path) => catalogue::load_file(path)?,
        None => catalogue::select(env)?,
    };
    Ok(preset)
}
