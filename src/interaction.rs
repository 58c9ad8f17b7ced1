//! Decisions the run coordinator delegates to the user.
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use crate::coordinator::TaskOutcome;
use crate::error::TaskError;
use crate::tasks::{Preset, Task};

/// Synchronous questions asked during a run.
pub trait Interaction {
    /// Whether to start running `preset` at all.
    fn confirm_run(&self, preset: &Preset) -> bool;

    /// Whether to go on with the remaining tasks after `task` failed.
    fn continue_after_failure(&self, task: &Task, error: &TaskError) -> bool;

    /// Called after every attempted task.
    fn task_finished(&self, _outcome: &TaskOutcome) {}
}

/// Interaction that always gives the same answers (`--yes`, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAnswer {
    /// Answer to [`Interaction::continue_after_failure`].
    pub continue_on_error: bool,
}

impl FixedAnswer {
    /// Confirm the run and keep going after failures.
    #[must_use]
    pub const fn always_continue() -> Self {
        Self {
            continue_on_error: true,
        }
    }

    /// Confirm the run and stop at the first failure.
    #[must_use]
    pub const fn abort_on_error() -> Self {
        Self {
            continue_on_error: false,
        }
    }
}

impl Interaction for FixedAnswer {
    fn confirm_run(&self, _preset: &Preset) -> bool {
        true
    }

    fn continue_after_failure(&self, _task: &Task, _error: &TaskError) -> bool {
        self.continue_on_error
    }
}

/// Interaction that asks yes/no questions on a reader/writer pair.
///
/// Anything other than `y` or `yes` (case-insensitive), including end of
/// input or a read error, counts as "no".
pub struct Prompt<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> std::fmt::Debug for Prompt<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt").finish_non_exhaustive()
    }
}

impl Prompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process's standard input and output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    /// Prompt using `reader` for answers and `writer` for questions.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    /// Ask `question` and return whether the answer was yes.
    pub fn ask(&self, question: &str) -> bool {
        let Ok(mut guard) = self.io.lock() else {
            return false;
        };
        let (reader, writer) = &mut *guard;
        if write!(writer, "{question} (y/N): ")
            .and_then(|()| writer.flush())
            .is_err()
        {
            return false;
        }
        let mut input = String::new();
        match reader.read_line(&mut input) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(input.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }

    /// Consume the prompt, returning the reader and writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock was poisoned.
    pub fn into_inner(self) -> io::Result<(R, W)> {
        self.io
            .into_inner()
            .map_err(|_| io::Error::other("prompt lock poisoned"))
    }
}

impl<R: BufRead, W: Write> Interaction for Prompt<R, W> {
    fn confirm_run(&self, preset: &Preset) -> bool {
        self.ask(&format!(
            "Proceed with '{}' ({} tasks)?",
            preset.name,
            preset.tasks.len()
        ))
    }

    fn continue_after_failure(&self, task: &Task, _error: &TaskError) -> bool {
        self.ask(&format!(
            "Task '{}' failed. Continue with remaining tasks?",
            task.name
        ))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tasks::test_helpers::command_task;
    use std::io::Cursor;

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn preset() -> Preset {
        Preset {
            name: "Demo".to_string(),
            environment: "Test".to_string(),
            description: String::new(),
            tasks: vec![command_task("a", &["true"])],
        }
    }

    #[test]
    fn yes_answers_are_accepted() {
        for answer in ["y\n", "Y\n", "yes\n", "  YES  \n"] {
            assert!(prompt(answer).ask("Go?"), "{answer:?}");
        }
    }

    #[test]
    fn anything_else_is_no() {
        for answer in ["n\n", "\n", "sure\n", ""] {
            assert!(!prompt(answer).ask("Go?"), "{answer:?}");
        }
    }

    #[test]
    fn question_is_written_to_output() {
        let p = prompt("y\n");
        assert!(p.confirm_run(&preset()));
        let (_, out) = p.into_inner().unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "Proceed with 'Demo' (1 tasks)? (y/N): ");
    }

    #[test]
    fn failure_question_names_the_task() {
        let p = prompt("n\n");
        let task = command_task("Install Docker", &["false"]);
        assert!(!p.continue_after_failure(&task, &TaskError::EmptyCommand));
        let (_, out) = p.into_inner().unwrap();
        assert!(String::from_utf8(out).unwrap().contains("'Install Docker' failed"));
    }

    #[test]
    fn answers_are_read_in_sequence() {
        let p = prompt("y\nn\n");
        let task = command_task("t", &["false"]);
        assert!(p.confirm_run(&preset()));
        assert!(!p.continue_after_failure(&task, &TaskError::EmptyCommand));
    }

    #[test]
    fn fixed_answer_is_constant() {
        let task = command_task("t", &["false"]);
        assert!(FixedAnswer::always_continue().continue_after_failure(&task, &TaskError::EmptyCommand));
        assert!(!FixedAnswer::abort_on_error().continue_after_failure(&task, &TaskError::EmptyCommand));
        assert!(FixedAnswer::default().confirm_run(&preset()));
    }
}
