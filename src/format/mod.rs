use crate::process::ProcessRunner;
use crate::task::{self, ExitCodes, FileTask};
use crate::{RepoEntry, TaskResult};
use regex::Regex;
use std::rc::Rc;

/// `dart format --set-exit-if-changed` exits with 1 when it rewrote the file.
const FORMAT_EXIT_CODES: ExitCodes =
    ExitCodes(&[(0, TaskResult::Accepted), (1, TaskResult::Modified)]);

/// Formats each staged Dart file with `dart format`.
pub struct FormatTask {
    runner: Rc<dyn ProcessRunner>,
    pattern: Regex,
}

impl FormatTask {
    pub fn new(runner: Rc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            pattern: task::pattern(r"\.dart$"),
        }
    }
}

impl FileTask for FormatTask {
    fn name(&self) -> &str {
        "format"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn apply(&self, entry: &RepoEntry) -> task::Result<TaskResult> {
        let file = entry.file.to_string_lossy();
        let code = self.runner.run(
            "dart",
            &["format", "--fix", "--set-exit-if-changed", file.as_ref()],
        )?;
        FORMAT_EXIT_CODES.map("dart format", code)
    }
}
