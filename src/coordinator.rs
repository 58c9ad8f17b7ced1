//! Run coordinator: sequence a preset's tasks through the dispatcher,
//! aggregate outcomes, and apply the continue/abort policy.
use std::time::Duration;

use crate::config::Settings;
use crate::error::{PrerequisiteError, TaskError};
use crate::interaction::Interaction;
use crate::logging::{TaskStatus, format_duration};
use crate::tasks::{self, Context, ExecutionMode, Outcome, Preset};

/// Targets of the pre-run health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisites {
    /// Host pinged to confirm connectivity.
    pub connectivity_host: String,
    /// Path whose disk usage is reported.
    pub disk_path: String,
}

impl Default for Prerequisites {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for Prerequisites {
    fn from(settings: &Settings) -> Self {
        Self {
            connectivity_host: settings.connectivity_host.clone(),
            disk_path: settings.disk_path.clone(),
        }
    }
}

/// Result of one attempted task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// 1-based position in the preset.
    pub index: usize,
    /// Task name.
    pub name: String,
    /// What the dispatcher returned.
    pub result: Result<Outcome, TaskError>,
}

impl TaskOutcome {
    /// Whether the task completed (or was simulated) without error.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Time spent, for tasks that actually ran.
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        match &self.result {
            Ok(Outcome::Completed { duration, .. }) => Some(*duration),
            _ => None,
        }
    }
}

/// Aggregate result of a run.
#[derive(Debug)]
pub struct RunReport {
    /// Number of tasks in the preset.
    pub total: usize,
    /// Tasks handed to the dispatcher.
    pub attempted: usize,
    /// Tasks that completed successfully (or were simulated).
    pub executed: usize,
    /// Tasks that returned an error.
    pub failed: usize,
    /// Per-task outcomes, in order, for attempted tasks only.
    pub outcomes: Vec<TaskOutcome>,
    /// Whether the run stopped early after a declined continue.
    pub aborted: bool,
}

impl RunReport {
    /// Tasks never attempted because the run was aborted.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.total - self.attempted
    }

    /// `true` when every task was attempted and none failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0 && !self.aborted
    }
}

/// Drives a preset against the host through the dispatcher.
pub struct RunCoordinator<'a> {
    ctx: &'a Context,
    interaction: &'a dyn Interaction,
}

impl std::fmt::Debug for RunCoordinator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("ctx", self.ctx)
            .field("interaction", &"<dyn Interaction>")
            .finish()
    }
}

impl<'a> RunCoordinator<'a> {
    /// Coordinator using `ctx` for execution and logging, and `interaction`
    /// for continue/abort decisions.
    #[must_use]
    pub fn new(ctx: &'a Context, interaction: &'a dyn Interaction) -> Self {
        Self { ctx, interaction }
    }

    /// Run every task of `preset` in order, one attempt each.
    ///
    /// A failed task is reported, then the interaction decides whether to
    /// continue. Declining stops the run; the remaining tasks are recorded
    /// as skipped and never dispatched.
    pub fn run(&self, preset: &Preset, mode: ExecutionMode) -> RunReport {
        let log = &self.ctx.log;
        let total = preset.tasks.len();
        let mut report = RunReport {
            total,
            attempted: 0,
            executed: 0,
            failed: 0,
            outcomes: Vec::with_capacity(total),
            aborted: false,
        };

        for (i, task) in preset.tasks.iter().enumerate() {
            log.stage(&format!("Executing task {}/{total}: {}", i + 1, task.name));
            if let Some(description) = &task.description {
                log.debug(description);
            }

            let result = tasks::execute(self.ctx, task, mode);
            report.attempted += 1;
            match &result {
                Ok(Outcome::Completed { duration, notice }) => {
                    if let Some(notice) = notice {
                        log.info(notice);
                    }
                    let took = format_duration(*duration);
                    log.info(&format!("✓ Task completed: {} ({took})", task.name));
                    log.record_task(&task.name, TaskStatus::Ok, Some(&took));
                    report.executed += 1;
                }
                Ok(Outcome::Simulated(_)) => {
                    log.record_task(&task.name, TaskStatus::DryRun, None);
                    report.executed += 1;
                }
                Err(e) => {
                    log.error(&format!("Error executing task '{}': {e}", task.name));
                    let detail = if e.is_input_error() {
                        format!("invalid task definition: {e}")
                    } else {
                        e.to_string()
                    };
                    log.record_task(&task.name, TaskStatus::Failed, Some(&detail));
                    report.failed += 1;
                }
            }

            let outcome = TaskOutcome {
                index: i + 1,
                name: task.name.clone(),
                result,
            };
            self.interaction.task_finished(&outcome);
            let stop = match &outcome.result {
                Err(e) => !self.interaction.continue_after_failure(task, e),
                Ok(_) => false,
            };
            report.outcomes.push(outcome);

            if stop {
                report.aborted = true;
                log.warn(&format!("Run aborted after task '{}'", task.name));
                for remaining in preset.tasks.iter().skip(i + 1) {
                    log.record_task(&remaining.name, TaskStatus::Skipped, Some("run aborted"));
                }
                break;
            }
        }

        report
    }

    /// Check that the host is fit to start a run.
    ///
    /// Running as root is only a warning. An unreachable connectivity host
    /// or a failing disk probe stops the run.
    ///
    /// # Errors
    ///
    /// - [`PrerequisiteError::Network`] if the ping fails.
    /// - [`PrerequisiteError::DiskSpace`] if `df` cannot be run.
    pub fn validate_prerequisites(&self, checks: &Prerequisites) -> Result<(), PrerequisiteError> {
        let log = &self.ctx.log;
        let executor = &self.ctx.executor;
        log.stage("Checking prerequisites");

        match executor.run("id", &["-u"]) {
            Ok(r) if r.stdout.trim() == "0" => log.warn(
                "Running as root is not recommended; tasks use sudo where they need it",
            ),
            Ok(_) => log.debug("not running as root"),
            Err(e) => log.debug(&format!("could not determine user id: {e:#}")),
        }

        let host = checks.connectivity_host.as_str();
        match executor.run_unchecked("ping", &["-c", "1", host]) {
            Ok(r) if r.success => log.info("✓ Network connectivity OK"),
            Ok(_) => {
                return Err(PrerequisiteError::Network {
                    host: host.to_string(),
                });
            }
            Err(e) => {
                log.debug(&format!("ping could not run: {e:#}"));
                return Err(PrerequisiteError::Network {
                    host: host.to_string(),
                });
            }
        }

        let usage = executor
            .run("df", &["-h", &checks.disk_path])
            .map_err(|e| PrerequisiteError::DiskSpace(format!("{e:#}")))?;
        log.info("Disk usage:");
        for line in usage.stdout.lines() {
            log.info(line);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::exec::{ExecResult, MockExecutor, ProcessExit};
    use crate::interaction::FixedAnswer;
    use crate::logging::TaskEntry;
    use crate::tasks::test_helpers::{command_task, make_context};
    use crate::tasks::Task;

    fn preset(tasks: Vec<Task>) -> Preset {
        Preset {
            name: "Test".to_string(),
            environment: "Test".to_string(),
            description: String::new(),
            tasks,
        }
    }

    /// Mock that fails any command whose program is `false`.
    fn exit_by_program() -> (MockExecutor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().returning(move |program, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            let success = program != "false";
            Ok(ProcessExit {
                success,
                code: Some(i32::from(!success)),
            })
        });
        (mock, calls)
    }

    fn statuses(entries: &[TaskEntry]) -> Vec<TaskStatus> {
        entries.iter().map(|e| e.status).collect()
    }

    #[test]
    fn abort_stops_before_remaining_tasks() {
        let (mock, calls) = exit_by_program();
        let (ctx, log) = make_context(mock);
        let interaction = FixedAnswer::abort_on_error();
        let p = preset(vec![
            command_task("one", &["true"]),
            command_task("two", &["false"]),
            command_task("three", &["true"]),
        ]);

        let report = RunCoordinator::new(&ctx, &interaction).run(&p, ExecutionMode::Live);

        assert_eq!(report.total, 3);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped(), 1);
        assert!(report.aborted);
        assert!(!report.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            statuses(&log.task_entries()),
            vec![TaskStatus::Ok, TaskStatus::Failed, TaskStatus::Skipped]
        );
    }

    #[test]
    fn continue_runs_every_task() {
        let (mock, calls) = exit_by_program();
        let (ctx, _log) = make_context(mock);
        let interaction = FixedAnswer::always_continue();
        let p = preset(vec![
            command_task("one", &["false"]),
            command_task("two", &["true"]),
        ]);

        let report = RunCoordinator::new(&ctx, &interaction).run(&p, ExecutionMode::Live);

        assert_eq!(report.attempted, 2);
        assert_eq!(report.executed, 1);
        assert!(!report.aborted);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.outcomes[0].index, 1);
        assert!(!report.outcomes[0].succeeded());
        assert!(report.outcomes[1].duration().is_some());
    }

    #[test]
    fn dry_run_reports_every_task_simulated() {
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().never();
        let (ctx, log) = make_context(mock);
        let interaction = FixedAnswer::abort_on_error();
        let p = preset(vec![
            command_task("one", &["true"]),
            command_task("two", &["/bin/false"]),
        ]);

        let report = RunCoordinator::new(&ctx, &interaction).run(&p, ExecutionMode::DryRun);

        assert_eq!(report.attempted, 2);
        assert_eq!(report.failed, 0);
        assert!(report.is_success());
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| matches!(o.result, Ok(Outcome::Simulated(_))))
        );
        assert_eq!(
            statuses(&log.task_entries()),
            vec![TaskStatus::DryRun, TaskStatus::DryRun]
        );
    }

    #[test]
    fn malformed_task_is_recorded_as_invalid_definition() {
        let mut mock = MockExecutor::new();
        mock.expect_run_interactive().never();
        let (ctx, log) = make_context(mock);
        let interaction = FixedAnswer::always_continue();
        let p = preset(vec![command_task("blank", &["   "])]);

        let report = RunCoordinator::new(&ctx, &interaction).run(&p, ExecutionMode::Live);

        assert_eq!(report.failed, 1);
        let entries = log.task_entries();
        assert_eq!(
            entries[0].message.as_deref(),
            Some("invalid task definition: empty command")
        );
    }

    #[test]
    fn host_failure_is_recorded_verbatim() {
        let (mock, _calls) = exit_by_program();
        let (ctx, log) = make_context(mock);
        let interaction = FixedAnswer::always_continue();
        let p = preset(vec![command_task("fails", &["false"])]);

        RunCoordinator::new(&ctx, &interaction).run(&p, ExecutionMode::Live);

        assert_eq!(
            log.task_entries()[0].message.as_deref(),
            Some("command failed: false (exit 1)")
        );
    }

    #[test]
    fn default_targets_follow_settings_defaults() {
        let settings = Settings::default();
        let checks = Prerequisites::default();
        assert_eq!(checks.connectivity_host, settings.connectivity_host);
        assert_eq!(checks.disk_path, settings.disk_path);

        let custom = Settings {
            connectivity_host: "1.1.1.1".to_string(),
            ..Settings::default()
        };
        assert_eq!(Prerequisites::from(&custom).connectivity_host, "1.1.1.1");
    }

    #[test]
    fn empty_preset_is_trivially_successful() {
        let (ctx, _log) = make_context(MockExecutor::new());
        let interaction = FixedAnswer::default();
        let report = RunCoordinator::new(&ctx, &interaction).run(&preset(Vec::new()), ExecutionMode::Live);
        assert_eq!(report.total, 0);
        assert!(report.is_success());
    }

    #[test]
    fn interaction_sees_every_attempted_task() {
        #[derive(Default)]
        struct Counting(AtomicUsize);
        impl Interaction for Counting {
            fn confirm_run(&self, _: &Preset) -> bool {
                true
            }
            fn continue_after_failure(&self, _: &Task, _: &TaskError) -> bool {
                false
            }
            fn task_finished(&self, _: &TaskOutcome) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let (mock, _calls) = exit_by_program();
        let (ctx, _log) = make_context(mock);
        let interaction = Counting::default();
        let p = preset(vec![
            command_task("one", &["true"]),
            command_task("two", &["false"]),
            command_task("three", &["true"]),
        ]);
        RunCoordinator::new(&ctx, &interaction).run(&p, ExecutionMode::Live);
        assert_eq!(interaction.0.load(Ordering::SeqCst), 2);
    }

    fn ok_output(stdout: &str) -> ExecResult {
        ExecResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    fn prerequisite_mock(ping_ok: bool, df_ok: bool) -> MockExecutor {
        let mut mock = MockExecutor::new();
        mock.expect_run()
            .withf(|program, _| program == "id")
            .returning(|_, _| Ok(ok_output("1000\n")));
        mock.expect_run_unchecked()
            .withf(|program, args| program == "ping" && args == ["-c", "1", "8.8.8.8"])
            .returning(move |_, _| {
                Ok(ExecResult {
                    success: ping_ok,
                    code: Some(i32::from(!ping_ok)),
                    ..ExecResult::default()
                })
            });
        mock.expect_run()
            .withf(|program, args| program == "df" && args == ["-h", "/"])
            .returning(move |_, _| {
                if df_ok {
                    Ok(ok_output("Filesystem Size Used Avail Use% Mounted on\n/dev/root 30G 10G 20G 34% /\n"))
                } else {
                    Err(anyhow::anyhow!("df failed (exit 1)"))
                }
            });
        mock
    }

    #[test]
    fn prerequisites_pass() {
        let (ctx, _log) = make_context(prerequisite_mock(true, true));
        let interaction = FixedAnswer::default();
        let result = RunCoordinator::new(&ctx, &interaction).validate_prerequisites(&Prerequisites::default());
        assert!(result.is_ok());
    }

    #[test]
    fn unreachable_host_is_network_error() {
        let (ctx, _log) = make_context(prerequisite_mock(false, true));
        let interaction = FixedAnswer::default();
        let err = RunCoordinator::new(&ctx, &interaction)
            .validate_prerequisites(&Prerequisites::default())
            .unwrap_err();
        assert!(matches!(err, PrerequisiteError::Network { ref host } if host == "8.8.8.8"));
    }

    #[test]
    fn failing_df_is_disk_space_error() {
        let (ctx, _log) = make_context(prerequisite_mock(true, false));
        let interaction = FixedAnswer::default();
        let err = RunCoordinator::new(&ctx, &interaction)
            .validate_prerequisites(&Prerequisites::default())
            .unwrap_err();
        assert!(matches!(err, PrerequisiteError::DiskSpace(_)));
    }

    #[test]
    fn running_as_root_is_only_a_warning() {
        let mut mock = MockExecutor::new();
        mock.expect_run()
            .withf(|program, _| program == "id")
            .returning(|_, _| Ok(ok_output("0\n")));
        mock.expect_run_unchecked()
            .returning(|_, _| Ok(ok_output("")));
        mock.expect_run()
            .withf(|program, _| program == "df")
            .returning(|_, _| Ok(ok_output("")));
        let (ctx, _log) = make_context(mock);
        let interaction = FixedAnswer::default();
        assert!(
            RunCoordinator::new(&ctx, &interaction)
                .validate_prerequisites(&Prerequisites::default())
                .is_ok()
        );
    }
}
