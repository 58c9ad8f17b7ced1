// Shared helpers for integration tests.
//
// Builds a task context backed by the real system executor and a home
// directory inside a temporary directory, so tests that write files or
// take backups never touch the real home.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use linux_setup_cli::exec::SystemExecutor;
use linux_setup_cli::logging::Logger;
use linux_setup_cli::tasks::{Context, Preset, Task, TaskKind};

/// A context whose home is a fresh temporary directory.
pub struct TestHost {
    /// Keeps the temporary home alive for the life of the test.
    pub home: tempfile::TempDir,
    /// Logger shared with the context, for inspecting recorded tasks.
    pub log: Arc<Logger>,
    /// Context handed to the dispatcher and coordinator.
    pub ctx: Context,
}

impl TestHost {
    pub fn new() -> Self {
        let home = tempfile::tempdir().expect("create temp home");
        let log = Arc::new(Logger::new("test"));
        let ctx = Context::with_home(
            log.clone(),
            Arc::new(SystemExecutor),
            home.path().to_path_buf(),
        );
        Self { home, log, ctx }
    }

    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        self.home.path().join(relative)
    }
}

/// A command task running each of `commands` in order.
pub fn command_task(name: &str, commands: &[&str]) -> Task {
    task(
        name,
        TaskKind::Command {
            commands: commands.iter().map(|c| (*c).to_string()).collect(),
        },
    )
}

pub fn task(name: &str, kind: TaskKind) -> Task {
    Task {
        name: name.to_string(),
        description: None,
        kind,
        elevated: false,
        optional: false,
    }
}

pub fn preset(tasks: Vec<Task>) -> Preset {
    Preset {
        name: "Integration".to_string(),
        environment: "Test Host".to_string(),
        description: String::new(),
        tasks,
    }
}

/// Write `text` to `root/name`, creating parent directories.
pub fn write(root: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, text).expect("write file");
    path
}
