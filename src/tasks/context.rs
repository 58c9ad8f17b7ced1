//! Execution context shared by every task.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::exec::Executor;
use crate::logging::Log;

/// Shared context for task execution.
pub struct Context {
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// User's home directory path.
    pub home: PathBuf,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("home", &self.home)
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the `HOME` environment variable is not set.
    pub fn new(log: Arc<dyn Log>, executor: Arc<dyn Executor>) -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?;
        Ok(Self::with_home(log, executor, PathBuf::from(home)))
    }

    /// Creates a context with an explicit home directory.
    #[must_use]
    pub fn with_home(log: Arc<dyn Log>, executor: Arc<dyn Executor>, home: PathBuf) -> Self {
        Self {
            log,
            executor,
            home,
        }
    }
}
