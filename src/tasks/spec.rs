//! Positional wire form of a task, as written in preset files.
//!
//! Preset files describe every task with the same flat shape: a `type`
//! string, a `commands` list and a `script` text.  [`TaskSpec`] captures that
//! shape and converts into the typed [`Task`] exactly once, at load time, so
//! malformed tasks are rejected before a run starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{FileWrite, ServiceAction, ServiceControl, Task, TaskKind};
use crate::error::TaskError;

/// A task as it appears in a preset file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskSpec {
    /// Display name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// One of `command`, `script`, `file`, `service`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-dependent positional arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// Script body (script) or file content (file).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,
    /// Advisory: the task conceptually needs root.
    #[serde(default)]
    pub elevated: bool,
    /// Advisory: the task may be left out.
    #[serde(default)]
    pub optional: bool,
}

impl TryFrom<TaskSpec> for Task {
    type Error = TaskError;

    fn try_from(spec: TaskSpec) -> Result<Self, Self::Error> {
        if spec.name.trim().is_empty() {
            return Err(TaskError::MissingField {
                task: "<unnamed>".to_string(),
                field: "a name",
            });
        }

        let mut positional = spec.commands.into_iter();
        let kind = match spec.kind.as_str() {
            "command" => TaskKind::Command {
                commands: positional.collect(),
            },
            "script" => TaskKind::Script { body: spec.script },
            "file" => {
                let path = positional
                    .next()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| TaskError::MissingField {
                        task: spec.name.clone(),
                        field: "destination path (commands[0])",
                    })?;
                TaskKind::File(FileWrite {
                    path: PathBuf::from(path),
                    content: spec.script,
                    mode: positional.next(),
                })
            }
            "service" => {
                let name = positional
                    .next()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| TaskError::MissingField {
                        task: spec.name.clone(),
                        field: "service name (commands[0])",
                    })?;
                let action: ServiceAction = positional
                    .next()
                    .ok_or_else(|| TaskError::MissingField {
                        task: spec.name.clone(),
                        field: "service action (commands[1])",
                    })?
                    .parse()?;
                TaskKind::Service(ServiceControl { name, action })
            }
            other => return Err(TaskError::UnknownKind(other.to_string())),
        };

        Ok(Self {
            name: spec.name,
            description: Some(spec.description).filter(|d| !d.is_empty()),
            kind,
            elevated: spec.elevated,
            optional: spec.optional,
        })
    }
}

impl From<Task> for TaskSpec {
    fn from(task: Task) -> Self {
        let (kind, commands, script) = match task.kind {
            TaskKind::Command { commands } => ("command", commands, String::new()),
            TaskKind::Script { body } => ("script", Vec::new(), body),
            TaskKind::File(file) => {
                let mut commands = vec![file.path.to_string_lossy().into_owned()];
                commands.extend(file.mode);
                ("file", commands, file.content)
            }
            TaskKind::Service(service) => (
                "service",
                vec![service.name, service.action.to_string()],
                String::new(),
            ),
        };
        Self {
            name: task.name,
            description: task.description.unwrap_or_default(),
            kind: kind.to_string(),
            commands,
            script,
            elevated: task.elevated,
            optional: task.optional,
        }
    }
}
