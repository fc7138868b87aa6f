use crate::process::ProcessError;
use crate::{RepoEntry, TaskResult};
use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

/// Unrecoverable task failure. Never part of the result lattice.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("`{program}` exited with unexpected code {code}")]
    UnexpectedExitCode { program: String, code: i32 },
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed input: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Mapping from an external tool's exit code to a task outcome.
#[derive(Debug, Clone, Copy)]
pub struct ExitCodes(pub &'static [(i32, TaskResult)]);

impl ExitCodes {
    pub fn get(&self, code: i32) -> Option<TaskResult> {
        self.0
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, result)| *result)
    }

    /// Map `code`, treating anything outside the table as an error.
    pub fn map(&self, program: &str, code: i32) -> Result<TaskResult> {
        self.get(code).ok_or_else(|| TaskError::UnexpectedExitCode {
            program: program.to_string(),
            code,
        })
    }
}

/// A task applied to one staged file at a time.
pub trait FileTask {
    fn name(&self) -> &str;

    /// Pre-filter matched against [`RepoEntry::path`].
    fn pattern(&self) -> &Regex;

    fn can_process(&self, entry: &RepoEntry) -> bool {
        self.pattern().is_match(&entry.path)
    }

    /// Check or fix `entry`. Returning [`TaskResult::Modified`] means the
    /// file on disk was rewritten.
    fn apply(&self, entry: &RepoEntry) -> Result<TaskResult>;
}

/// A task applied once to every staged file it accepts.
pub trait RepoTask {
    fn name(&self) -> &str;

    fn pattern(&self) -> &Regex;

    fn can_process(&self, entry: &RepoEntry) -> bool {
        self.pattern().is_match(&entry.path)
    }

    /// Run even when no staged file matches.
    fn call_for_empty_entries(&self) -> bool {
        false
    }

    fn apply(&self, entries: &[RepoEntry]) -> Result<TaskResult>;
}

/// A registered task, tagged by kind.
pub enum Task {
    File(Box<dyn FileTask>),
    Repo(Box<dyn RepoTask>),
}

impl Task {
    pub fn name(&self) -> &str {
        match self {
            Task::File(task) => task.name(),
            Task::Repo(task) => task.name(),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::File(task) => f.debug_tuple("File").field(&task.name()).finish(),
            Task::Repo(task) => f.debug_tuple("Repo").field(&task.name()).finish(),
        }
    }
}

/// Compile one of the built-in task patterns.
pub(crate) fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in task pattern")
}
