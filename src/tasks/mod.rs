//! Task model: the immutable units of work a preset is made of.
mod context;
pub mod dispatch;
mod spec;

pub use context::Context;
pub use dispatch::{Outcome, execute};
pub use spec::TaskSpec;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TaskError;

/// Whether a dispatch call acts on the system or only describes its actions.
///
/// Passed explicitly into every dispatch so each call observes exactly one
/// mode for its whole duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Spawn processes and write files.
    #[default]
    Live,
    /// Report intended actions without side effects.
    DryRun,
}

impl ExecutionMode {
    /// Map the CLI `--dry-run` flag onto a mode.
    #[must_use]
    pub const fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Live }
    }

    /// `true` for [`ExecutionMode::DryRun`].
    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// One schedulable unit of setup work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "TaskSpec", into = "TaskSpec")]
pub struct Task {
    /// Display name; never empty.
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// What the task does and the data it needs to do it.
    pub kind: TaskKind,
    /// Advisory: the task conceptually needs root. Not consulted when
    /// dispatching commands or scripts.
    pub elevated: bool,
    /// Advisory: the task may be left out. Does not alter execution.
    pub optional: bool,
}

/// The four kinds of task, each carrying only the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Run each command line in order, stopping at the first failure.
    Command {
        /// Whitespace-tokenized command lines.
        commands: Vec<String>,
    },
    /// Write `body` to a temporary executable file and run it.
    Script {
        /// Script text, including its shebang line.
        body: String,
    },
    /// Create or truncate a file with the given content.
    File(FileWrite),
    /// Drive a service through `systemctl`.
    Service(ServiceControl),
}

impl TaskKind {
    /// Short lowercase label (`command`, `script`, `file`, `service`).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Script { .. } => "script",
            Self::File(_) => "file",
            Self::Service(_) => "service",
        }
    }
}

/// Payload of a file task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    /// Destination path.
    pub path: PathBuf,
    /// Exact bytes to write.
    pub content: String,
    /// Octal permission string (e.g. `"644"`), applied when it parses.
    pub mode: Option<String>,
}

impl FileWrite {
    /// Parse [`FileWrite::mode`] as octal permission bits.
    ///
    /// Returns `None` when no mode is set or it is not a valid octal value
    /// in `0..=0o7777`.
    #[must_use]
    pub fn permission_bits(&self) -> Option<u32> {
        let mode = self.mode.as_deref()?.trim();
        let mode = mode.strip_prefix("0o").unwrap_or(mode);
        u32::from_str_radix(mode, 8).ok().filter(|m| *m <= 0o7777)
    }
}

/// Payload of a service task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceControl {
    /// Unit name passed to `systemctl`.
    pub name: String,
    /// What to do with it.
    pub action: ServiceAction,
}

/// The fixed set of service actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    /// `systemctl start`
    Start,
    /// `systemctl stop`
    Stop,
    /// `systemctl enable`
    Enable,
    /// `systemctl disable`
    Disable,
    /// `systemctl restart`
    Restart,
    /// `systemctl reload`
    Reload,
    /// `systemctl status` (read-only)
    Status,
}

impl ServiceAction {
    /// Every action, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Start,
        Self::Stop,
        Self::Enable,
        Self::Disable,
        Self::Restart,
        Self::Reload,
        Self::Status,
    ];

    /// The `systemctl` verb for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::Status => "status",
        }
    }

    /// Whether the action needs root; only `status` is read-only.
    #[must_use]
    pub const fn requires_privilege(self) -> bool {
        !matches!(self, Self::Status)
    }

    /// Human-readable note about what the action means for `service`.
    #[must_use]
    pub fn follow_up(self, service: &str) -> Option<String> {
        let note = match self {
            Self::Start => format!("{service} is now running"),
            Self::Stop => format!("{service} has been stopped"),
            Self::Enable => format!("{service} will start on boot"),
            Self::Disable => format!("{service} will no longer start on boot"),
            Self::Restart => format!("{service} has been restarted"),
            Self::Reload => format!("{service} reloaded its configuration"),
            Self::Status => return None,
        };
        Some(note)
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| TaskError::InvalidServiceAction(s.to_string()))
    }
}

/// A named, ordered task list for one target environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Preset {
    /// Display name.
    pub name: String,
    /// Label of the environment the preset targets.
    pub environment: String,
    /// What the preset sets up.
    #[serde(default)]
    pub description: String,
    /// Tasks, executed in this order.
    #[serde(default)]
    pub tasks: Vec<Task>,
}
