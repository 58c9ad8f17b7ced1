//! Task dispatcher: route a [`Task`] to its kind-specific handler, or to
//! dry-run simulation.
use std::fs;
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;
use std::time::Duration;

use super::{Context, ExecutionMode, FileWrite, ServiceControl, Task, TaskKind};
use crate::error::TaskError;
use crate::runner;

/// Number of script lines shown in a dry-run preview.
const SCRIPT_PREVIEW_LINES: usize = 3;

/// Result of dispatching one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The task ran to completion.
    Completed {
        /// Wall-clock time spent running the task.
        duration: Duration,
        /// Follow-up note about the effect of the task, if any.
        notice: Option<String>,
    },
    /// Dry run: the lines describing what would have happened.
    Simulated(Vec<String>),
}

/// Execute `task` in the given `mode`.
///
/// In [`ExecutionMode::DryRun`] nothing is spawned or written; the simulated
/// actions are logged and returned. In [`ExecutionMode::Live`] the task's
/// handler runs and its first error is returned.
///
/// # Errors
///
/// Returns the [`TaskError`] that stopped the task. Dry runs never fail.
pub fn execute(ctx: &Context, task: &Task, mode: ExecutionMode) -> Result<Outcome, TaskError> {
    if mode.is_dry_run() {
        let lines = simulate(task);
        for line in &lines {
            ctx.log.dry_run(line);
        }
        return Ok(Outcome::Simulated(lines));
    }

    match &task.kind {
        TaskKind::Command { commands } => run_commands(ctx, commands).map(completed),
        TaskKind::Script { body } => run_script(ctx, body).map(completed),
        TaskKind::File(file) => write_file(ctx, &task.name, file).map(completed),
        TaskKind::Service(service) => control_service(ctx, service),
    }
}

const fn completed(duration: Duration) -> Outcome {
    Outcome::Completed {
        duration,
        notice: None,
    }
}

/// Describe what `task` would do without doing it.
#[must_use]
pub fn simulate(task: &Task) -> Vec<String> {
    let mut lines = vec![format!("Would execute task: {}", task.name)];
    match &task.kind {
        TaskKind::Command { commands } => {
            lines.extend(commands.iter().map(|c| format!("  Command: {c}")));
        }
        TaskKind::Script { body } => {
            lines.push("  Script:".to_string());
            let all: Vec<&str> = body.lines().collect();
            lines.extend(
                all.iter()
                    .take(SCRIPT_PREVIEW_LINES)
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| format!("    {l}")),
            );
            if all.len() > SCRIPT_PREVIEW_LINES {
                lines.push(format!(
                    "    ... ({} more lines)",
                    all.len() - SCRIPT_PREVIEW_LINES
                ));
            }
        }
        TaskKind::File(file) => {
            lines.push(format!("  Would write file: {}", file.path.display()));
        }
        TaskKind::Service(service) => {
            lines.push(format!(
                "  Would {} service: {}",
                service.action, service.name
            ));
        }
    }
    lines
}

/// Run each command in order; the first failure ends the task.
fn run_commands(ctx: &Context, commands: &[String]) -> Result<Duration, TaskError> {
    let total = commands.len();
    let mut elapsed = Duration::ZERO;
    for (i, command) in commands.iter().enumerate() {
        if total > 1 {
            ctx.log.info(&format!("Command {}/{total}: {command}", i + 1));
        }
        elapsed += runner::run(ctx, command)?;
    }
    Ok(elapsed)
}

/// Write `body` to a fresh executable temp file, run it, and remove it.
fn run_script(ctx: &Context, body: &str) -> Result<Duration, TaskError> {
    let mut file = tempfile::Builder::new()
        .prefix("setup-script-")
        .suffix(".sh")
        .tempfile()
        .map_err(|source| TaskError::Io {
            action: "create script in",
            path: std::env::temp_dir(),
            source,
        })?;
    file.write_all(body.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|source| TaskError::Io {
            action: "write script",
            path: file.path().to_path_buf(),
            source,
        })?;

    // Close the write handle before executing to avoid ETXTBSY.
    let path = file.into_temp_path();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(|source| {
        TaskError::Io {
            action: "make script executable",
            path: path.to_path_buf(),
            source,
        }
    })?;
    ctx.log.debug(&format!("script written to {}", path.display()));

    let result = runner::run_path(ctx, &path);

    let shown = path.display().to_string();
    if let Err(e) = path.close() {
        ctx.log
            .warn(&format!("could not remove temporary script {shown}: {e}"));
    }
    result
}

/// Create or truncate the target file and apply its permission bits.
fn write_file(ctx: &Context, task_name: &str, file: &FileWrite) -> Result<Duration, TaskError> {
    if file.path.as_os_str().is_empty() {
        return Err(TaskError::MissingField {
            task: task_name.to_string(),
            field: "destination path (commands[0])",
        });
    }
    let start = std::time::Instant::now();

    if let Some(parent) = file.path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| TaskError::Io {
            action: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&file.path, &file.content).map_err(|source| TaskError::Io {
        action: "write",
        path: file.path.clone(),
        source,
    })?;
    ctx.log.info(&format!(
        "Wrote {} bytes to {}",
        file.content.len(),
        file.path.display()
    ));

    if let Some(mode) = &file.mode {
        apply_mode(ctx, &file.path, mode, file.permission_bits());
    }
    Ok(start.elapsed())
}

/// Permission problems are reported but never fail the task.
fn apply_mode(ctx: &Context, path: &Path, mode: &str, bits: Option<u32>) {
    let Some(bits) = bits else {
        ctx.log.warn(&format!(
            "invalid permission mode '{mode}' for {}, leaving default permissions",
            path.display()
        ));
        return;
    };
    match fs::set_permissions(path, fs::Permissions::from_mode(bits)) {
        Ok(()) => ctx
            .log
            .debug(&format!("set permissions {bits:o} on {}", path.display())),
        Err(e) => ctx.log.warn(&format!(
            "could not set permissions {mode} on {}: {e}",
            path.display()
        )),
    }
}

/// Drive the service through `systemctl`; only `status` runs without sudo.
fn control_service(ctx: &Context, service: &ServiceControl) -> Result<Outcome, TaskError> {
    let command_line = if service.action.requires_privilege() {
        format!("sudo systemctl {} {}", service.action, service.name)
    } else {
        format!("systemctl {} {}", service.action, service.name)
    };
    let duration = runner::run(ctx, &command_line)?;
    Ok(Outcome::Completed {
        duration,
        notice: service.action.follow_up(&service.name),
    })
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::exec::{MockExecutor, ProcessExit};
    use crate::tasks::ServiceAction;
    use crate::tasks::test_helpers::{command_task, make_context, task};

    const OK: ProcessExit = ProcessExit {
        success: true,
        code: Some(0),
    };
    const FAIL: ProcessExit = ProcessExit {
        success: false,
        code: Some(1),
    };

    fn script_task(body: &str) -> Task {
        task(
            "script",
            TaskKind::Script {
                body: body.to_string(),
            },
        )
    }

    fn file_task(path: PathBuf, content: &str, mode: Option<&str>) -> Task {
        task(
            "file",
            TaskKind::File(FileWrite {
                path,
                content: content.to_string(),
                mode: mode.map(String::from),
            }),
        )
    }

    fn service_task(name: &str, action: ServiceAction) -> Task {
        task(
            "service",
            TaskKind::Service(ServiceControl {
                name: name.to_string(),
                action,
            }),
        )
    }

    // ------------------------------------------------------------------
    // command
    // ------------------------------------------------------------------

    #[test]
    fn commands_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_mock = Arc::clone(&seen);
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive()
            .times(3)
            .returning(move |program, args| {
                let mut line = vec![program.to_string()];
                line.extend(args.iter().map(ToString::to_string));
                seen_in_mock.lock().unwrap().push(line.join(" "));
                Ok(OK)
            });
        let (ctx, _log) = make_context(mock);
        let t = command_task("three", &["echo one", "echo two", "echo three"]);
        let outcome = execute(&ctx, &t, ExecutionMode::Live).unwrap();
        assert!(matches!(outcome, Outcome::Completed { notice: None, .. }));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["echo one", "echo two", "echo three"]
        );
    }

    #[test]
    fn failing_command_stops_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().returning(move |program, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(if program == "false" { FAIL } else { OK })
        });
        let (ctx, _log) = make_context(mock);
        let t = command_task("stops", &["true", "false", "touch /never"]);
        let err = execute(&ctx, &t, ExecutionMode::Live).unwrap_err();
        assert!(matches!(err, TaskError::CommandFailed { ref command, .. } if command == "false"));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "third command must not run");
    }

    #[test]
    fn empty_command_string_fails_task() {
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().never();
        let (ctx, _log) = make_context(mock);
        let t = command_task("blank", &["  "]);
        assert!(matches!(
            execute(&ctx, &t, ExecutionMode::Live),
            Err(TaskError::EmptyCommand)
        ));
    }

    // ------------------------------------------------------------------
    // script
    // ------------------------------------------------------------------

    fn capture_script_path(success: bool) -> (MockExecutor, Arc<Mutex<Option<PathBuf>>>) {
        let captured = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&captured);
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive()
            .times(1)
            .returning(move |program, args| {
                assert!(args.is_empty());
                let path = PathBuf::from(program);
                assert!(path.exists(), "script must exist while running");
                let mode = fs::metadata(&path).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o755);
                let name = path.file_name().unwrap().to_string_lossy().to_string();
                assert!(name.starts_with("setup-script-") && name.ends_with(".sh"));
                *slot.lock().unwrap() = Some(path);
                Ok(if success { OK } else { FAIL })
            });
        (mock, captured)
    }

    #[test]
    fn script_file_removed_after_success() {
        let (mock, captured) = capture_script_path(true);
        let (ctx, _log) = make_context(mock);
        execute(&ctx, &script_task("#!/bin/sh\necho hi\n"), ExecutionMode::Live).unwrap();
        let path = captured.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "temp script should be removed");
    }

    #[test]
    fn script_file_removed_after_failure() {
        let (mock, captured) = capture_script_path(false);
        let (ctx, _log) = make_context(mock);
        let result = execute(&ctx, &script_task("#!/bin/sh\nexit 1\n"), ExecutionMode::Live);
        assert!(result.is_err());
        let path = captured.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "temp script should be removed on failure too");
    }

    #[test]
    fn script_body_is_written_verbatim() {
        let body = "#!/bin/sh\n# keep   spacing\necho \"a  b\"\n";
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().returning(move |program, _| {
            let written = fs::read_to_string(program).unwrap();
            assert_eq!(written, "#!/bin/sh\n# keep   spacing\necho \"a  b\"\n");
            Ok(OK)
        });
        let (ctx, _log) = make_context(mock);
        execute(&ctx, &script_task(body), ExecutionMode::Live).unwrap();
    }

    #[test]
    fn real_script_runs_through_shebang() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let body = format!("#!/bin/sh\ntouch '{}'\n", marker.display());
        let (ctx, _log) = make_context(crate::exec::SystemExecutor);
        execute(&ctx, &script_task(&body), ExecutionMode::Live).unwrap();
        assert!(marker.exists());
    }

    // ------------------------------------------------------------------
    // file
    // ------------------------------------------------------------------

    #[test]
    fn file_written_with_parents_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x").join("out.txt");
        let (ctx, _log) = make_context(MockExecutor::new());
        execute(
            &ctx,
            &file_task(target.clone(), "hello", Some("644")),
            ExecutionMode::Live,
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o644);
    }

    #[test]
    fn file_is_truncated_on_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        fs::write(&target, "a much longer previous content").unwrap();
        let (ctx, _log) = make_context(MockExecutor::new());
        execute(&ctx, &file_task(target.clone(), "new", None), ExecutionMode::Live).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn invalid_mode_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let (ctx, _log) = make_context(MockExecutor::new());
        let outcome = execute(
            &ctx,
            &file_task(target.clone(), "x", Some("rw-r--r--")),
            ExecutionMode::Live,
        );
        assert!(outcome.is_ok());
        assert_eq!(fs::read_to_string(&target).unwrap(), "x");
    }

    #[test]
    fn empty_path_fails_before_writing() {
        let (ctx, _log) = make_context(MockExecutor::new());
        let err = execute(
            &ctx,
            &file_task(PathBuf::new(), "hello", None),
            ExecutionMode::Live,
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::MissingField { .. }));
    }

    #[test]
    fn unwritable_target_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let (ctx, _log) = make_context(MockExecutor::new());
        let err = execute(
            &ctx,
            &file_task(blocker.join("child.txt"), "x", None),
            ExecutionMode::Live,
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::Io { .. }));
    }

    // ------------------------------------------------------------------
    // service
    // ------------------------------------------------------------------

    #[test]
    fn enable_runs_through_sudo_with_follow_up() {
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive()
            .withf(|program, args| program == "sudo" && args == ["systemctl", "enable", "docker"])
            .times(1)
            .returning(|_, _| Ok(OK));
        let (ctx, _log) = make_context(mock);
        let outcome = execute(
            &ctx,
            &service_task("docker", ServiceAction::Enable),
            ExecutionMode::Live,
        )
        .unwrap();
        let Outcome::Completed { notice, .. } = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(notice.as_deref(), Some("docker will start on boot"));
    }

    #[test]
    fn status_runs_without_sudo() {
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive()
            .withf(|program, args| program == "systemctl" && args == ["status", "ssh"])
            .times(1)
            .returning(|_, _| Ok(OK));
        let (ctx, _log) = make_context(mock);
        let outcome = execute(
            &ctx,
            &service_task("ssh", ServiceAction::Status),
            ExecutionMode::Live,
        )
        .unwrap();
        assert!(matches!(outcome, Outcome::Completed { notice: None, .. }));
    }

    #[test]
    fn failed_service_action_is_command_failure() {
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().returning(|_, _| Ok(FAIL));
        let (ctx, _log) = make_context(mock);
        let err = execute(
            &ctx,
            &service_task("nginx", ServiceAction::Restart),
            ExecutionMode::Live,
        )
        .unwrap_err();
        assert!(
            matches!(err, TaskError::CommandFailed { ref command, .. } if command == "sudo systemctl restart nginx")
        );
    }

    // ------------------------------------------------------------------
    // dry run
    // ------------------------------------------------------------------

    #[test]
    fn dry_run_never_spawns_or_writes() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x").join("out.txt");
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().never();
        mock.expect_run().never();
        mock.expect_run_unchecked().never();
        let (ctx, _log) = make_context(mock);
        let tasks = [
            command_task("c", &["rm -rf /"]),
            script_task("#!/bin/sh\nreboot\n"),
            file_task(target.clone(), "hello", Some("644")),
            service_task("nginx", ServiceAction::Stop),
        ];
        for t in &tasks {
            let outcome = execute(&ctx, t, ExecutionMode::DryRun).unwrap();
            assert!(matches!(outcome, Outcome::Simulated(_)));
        }
        assert!(!target.exists());
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn dry_run_lists_every_command() {
        let lines = simulate(&command_task("c", &["apt-get update", "apt-get upgrade -y"]));
        assert_eq!(
            lines,
            vec![
                "Would execute task: c",
                "  Command: apt-get update",
                "  Command: apt-get upgrade -y",
            ]
        );
    }

    #[test]
    fn dry_run_previews_first_script_lines() {
        let lines = simulate(&script_task("#!/bin/bash\n\necho one\necho two\necho three\n"));
        assert_eq!(
            lines,
            vec![
                "Would execute task: script",
                "  Script:",
                "    #!/bin/bash",
                "    echo one",
                "    ... (2 more lines)",
            ]
        );
    }

    #[test]
    fn dry_run_short_script_has_no_ellipsis() {
        let lines = simulate(&script_task("#!/bin/sh\necho hi"));
        assert_eq!(lines.len(), 4);
        assert!(!lines.iter().any(|l| l.contains("more lines")));
    }

    #[test]
    fn dry_run_file_and_service_notices() {
        let file = simulate(&file_task(PathBuf::from("/etc/motd"), "hi", None));
        assert_eq!(file[1], "  Would write file: /etc/motd");
        let service = simulate(&service_task("ssh", ServiceAction::Enable));
        assert_eq!(service[1], "  Would enable service: ssh");
    }
}
