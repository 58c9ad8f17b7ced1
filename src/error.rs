//! Domain-specific error types for the setup engine.
//!
//! Engine modules return typed errors (e.g., [`TaskError`], [`BackupError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! SetupError
//! ├── Task(TaskError)                 — task decoding and execution
//! ├── Backup(BackupError)             — backup root creation and listing
//! ├── Prerequisite(PrerequisiteError) — pre-run health checks
//! └── Preset(PresetError)             — preset loading and parsing
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the setup engine.
#[derive(Error, Debug)]
pub enum SetupError {
    /// A task could not be decoded or executed.
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// The backup root could not be created or read.
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// A pre-run health check failed.
    #[error("Prerequisite check failed: {0}")]
    Prerequisite(#[from] PrerequisiteError),

    /// A preset could not be loaded.
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),
}

/// Errors that arise while decoding or executing a single task.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task declares a type outside command/script/file/service.
    #[error("unknown task type: {0}")]
    UnknownKind(String),

    /// A field required by the task's type is absent or empty.
    #[error("task '{task}' is missing {field}")]
    MissingField {
        /// Name of the offending task.
        task: String,
        /// Description of the missing field.
        field: &'static str,
    },

    /// A service task requested an action outside the fixed set.
    #[error("invalid service action '{0}': must be one of start, stop, enable, disable, restart, reload, status")]
    InvalidServiceAction(String),

    /// A command line contained no tokens.
    #[error("empty command")]
    EmptyCommand,

    /// A spawned process exited unsuccessfully.
    #[error("command failed: {command} (exit {})", describe_exit(.code))]
    CommandFailed {
        /// The command line as written in the task.
        command: String,
        /// Exit code, or `None` when the process was killed by a signal.
        code: Option<i32>,
    },

    /// A process could not be started at all.
    #[error("failed to start '{command}': {source}")]
    Spawn {
        /// The command line as written in the task.
        command: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// A filesystem operation needed by the task failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being attempted (e.g. `"write"`).
        action: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Render an exit code for display; `None` means the process was signalled.
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl TaskError {
    /// Whether the error was caused by malformed task input rather than by
    /// the system the task ran against.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownKind(_)
                | Self::MissingField { .. }
                | Self::InvalidServiceAction(_)
                | Self::EmptyCommand
        )
    }
}

/// Errors that arise from the backup manager.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The backup root directory could not be created.
    #[error("failed to create backup directory {}: {source}", .path.display())]
    CreateRoot {
        /// Backup root that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The backup root directory could not be listed.
    #[error("failed to read backup directory {}: {source}", .path.display())]
    ReadRoot {
        /// Backup root that could not be listed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that prevent a run from starting.
#[derive(Error, Debug)]
pub enum PrerequisiteError {
    /// The connectivity probe did not reach its target.
    #[error("network connectivity check failed: no internet connectivity (could not reach {host})")]
    Network {
        /// Host the probe tried to reach.
        host: String,
    },

    /// The disk usage probe could not be run.
    #[error("disk space check failed: {0}")]
    DiskSpace(String),
}

/// Errors that arise while loading a preset.
#[derive(Error, Debug)]
pub enum PresetError {
    /// No embedded preset has the requested file name.
    #[error("embedded preset file not found: {0}")]
    NotFound(String),

    /// The preset source is not valid TOML or contains an invalid task.
    #[error("invalid preset {source_name}: {message}")]
    Parse {
        /// File name or path of the preset source.
        source_name: String,
        /// Parser message, including the offending task when applicable.
        message: String,
    },

    /// A preset file could not be read from disk.
    #[error("failed to read preset {}: {source}", .path.display())]
    Io {
        /// Path of the preset file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn unknown_kind_display() {
        let e = TaskError::UnknownKind("package".to_string());
        assert_eq!(e.to_string(), "unknown task type: package");
    }

    #[test]
    fn missing_field_display() {
        let e = TaskError::MissingField {
            task: "Write motd".to_string(),
            field: "destination path (commands[0])",
        };
        assert_eq!(
            e.to_string(),
            "task 'Write motd' is missing destination path (commands[0])"
        );
    }

    #[test]
    fn invalid_service_action_lists_allowed_actions() {
        let e = TaskError::InvalidServiceAction("banana".to_string());
        let msg = e.to_string();
        assert!(msg.contains("'banana'"));
        assert!(msg.contains("start, stop, enable, disable, restart, reload, status"));
    }

    #[test]
    fn command_failed_display_with_code() {
        let e = TaskError::CommandFailed {
            command: "/bin/false".to_string(),
            code: Some(1),
        };
        assert_eq!(e.to_string(), "command failed: /bin/false (exit 1)");
    }

    #[test]
    fn command_failed_display_without_code() {
        let e = TaskError::CommandFailed {
            command: "sleep 100".to_string(),
            code: None,
        };
        assert_eq!(e.to_string(), "command failed: sleep 100 (exit signal)");
    }

    #[test]
    fn io_error_display_includes_path() {
        let e = TaskError::Io {
            action: "write",
            path: PathBuf::from("/etc/motd"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(e.to_string(), "write /etc/motd: permission denied");
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(TaskError::EmptyCommand.is_input_error());
        assert!(TaskError::InvalidServiceAction("x".to_string()).is_input_error());
        assert!(
            !TaskError::CommandFailed {
                command: "false".to_string(),
                code: Some(1)
            }
            .is_input_error()
        );
    }

    #[test]
    fn spawn_error_has_source() {
        use std::error::Error as StdError;
        let e = TaskError::Spawn {
            command: "nope".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn network_error_display() {
        let e = PrerequisiteError::Network {
            host: "8.8.8.8".to_string(),
        };
        assert!(e.to_string().contains("no internet connectivity"));
        assert!(e.to_string().contains("8.8.8.8"));
    }

    #[test]
    fn backup_error_display_includes_path() {
        let e = BackupError::CreateRoot {
            path: PathBuf::from("/root/backups"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/root/backups"));
    }

    #[test]
    fn setup_error_from_task_error() {
        let e: SetupError = TaskError::EmptyCommand.into();
        assert_eq!(e.to_string(), "Task error: empty command");
    }

    #[test]
    fn setup_error_from_preset_error() {
        let e: SetupError = PresetError::NotFound("x.toml".to_string()).into();
        assert!(e.to_string().contains("Preset error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<SetupError>();
        assert_send_sync::<TaskError>();
        assert_send_sync::<BackupError>();
        assert_send_sync::<PrerequisiteError>();
        assert_send_sync::<PresetError>();
    }

    #[test]
    fn task_error_converts_to_anyhow() {
        let e = TaskError::UnknownKind("x".to_string());
        let _anyhow_err: anyhow::Error = e.into();
    }
}
