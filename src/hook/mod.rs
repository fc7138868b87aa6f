use crate::git::{GitError, Repository};
use crate::logger::{Logger, StatusGuard, StatusPhase, StatusUpdate};
use crate::task::{FileTask, RepoTask, Task, TaskError};
use crate::{HookResult, RepoEntry, TaskResult};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Unrecoverable failure of a run. Rejections are results, not errors.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to collect staged files: {0}")]
    Discovery(#[source] GitError),
    #[error("task `{task}` failed{}: {source}", on_entry(.entry))]
    Task {
        task: String,
        entry: Option<String>,
        #[source]
        source: TaskError,
    },
    #[error("failed to stage {path}: {source}")]
    Stage {
        path: String,
        #[source]
        source: GitError,
    },
}

fn on_entry(entry: &Option<String>) -> String {
    entry
        .as_ref()
        .map(|path| format!(" on {}", path))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, HookError>;

/// Why a run stopped before visiting every entry and task.
enum Stop {
    Rejected,
    Failed(HookError),
}

impl From<HookError> for Stop {
    fn from(err: HookError) -> Self {
        Stop::Failed(err)
    }
}

/// Runs every registered task over the staged files of a repository.
///
/// File tasks run per entry in registration order, then repo tasks run over
/// the entries they accept. A rejection ends the run unless
/// `continue_on_rejected` is set; a task error always ends it.
pub struct Hook<'a> {
    repository: &'a dyn Repository,
    logger: &'a dyn Logger,
    tasks: Vec<Task>,
    continue_on_rejected: bool,
}

impl<'a> Hook<'a> {
    pub fn new(repository: &'a dyn Repository, logger: &'a dyn Logger, tasks: Vec<Task>) -> Self {
        Self {
            repository,
            logger,
            tasks,
            continue_on_rejected: false,
        }
    }

    pub fn continue_on_rejected(mut self, enabled: bool) -> Self {
        self.continue_on_rejected = enabled;
        self
    }

    pub fn run(&self) -> Result<HookResult> {
        let _status = StatusGuard::new(self.logger);

        match self.run_all() {
            Ok(result) => {
                info!(?result, "hook finished");
                Ok(result)
            }
            Err(Stop::Rejected) => {
                info!("task rejected, aborting remaining tasks");
                Ok(HookResult::Rejected)
            }
            Err(Stop::Failed(err)) => Err(err),
        }
    }

    fn run_all(&self) -> std::result::Result<HookResult, Stop> {
        self.logger.update_status(
            StatusUpdate::message("Scanning for staged files...").phase(StatusPhase::Scanning),
        );
        let entries = self
            .repository
            .staged_entries()
            .map_err(HookError::Discovery)?;
        debug!(count = entries.len(), "collected staged files");

        let mut result = HookResult::Clean;
        for entry in &entries {
            result = result.raise(self.scan_entry(entry)?);
        }
        for task in self.repo_tasks() {
            result = result.raise(self.run_repo_task(task, &entries)?);
        }
        Ok(result)
    }

    fn file_tasks(&self) -> impl Iterator<Item = &dyn FileTask> {
        self.tasks.iter().filter_map(|task| match task {
            Task::File(task) => Some(task.as_ref()),
            Task::Repo(_) => None,
        })
    }

    fn repo_tasks(&self) -> impl Iterator<Item = &dyn RepoTask> {
        self.tasks.iter().filter_map(|task| match task {
            Task::Repo(task) => Some(task.as_ref()),
            Task::File(_) => None,
        })
    }

    fn scan_entry(&self, entry: &RepoEntry) -> std::result::Result<HookResult, Stop> {
        self.logger.update_status(
            StatusUpdate::message("Scanning")
                .detail(entry.path.clone())
                .phase(StatusPhase::Running),
        );

        let mut result = TaskResult::Accepted;
        for task in self.file_tasks() {
            if !task.can_process(entry) {
                continue;
            }
            let task_result = task.apply(entry).map_err(|source| HookError::Task {
                task: task.name().to_string(),
                entry: Some(entry.path.clone()),
                source,
            })?;
            debug!(task = task.name(), path = %entry.path, ?task_result, "file task done");
            result = result.raise(self.check_rejected(task_result)?);
        }

        let hook_result = self.settle(result, Some(entry))?;
        self.logger.update_status(StatusUpdate {
            phase: Some(StatusPhase::Done(hook_result)),
            ..StatusUpdate::default()
        });
        Ok(hook_result)
    }

    fn run_repo_task(
        &self,
        task: &dyn RepoTask,
        entries: &[RepoEntry],
    ) -> std::result::Result<HookResult, Stop> {
        let accepted: Vec<RepoEntry> = entries
            .iter()
            .filter(|entry| task.can_process(entry))
            .cloned()
            .collect();
        if accepted.is_empty() && !task.call_for_empty_entries() {
            debug!(task = task.name(), "no matching files, skipping");
            return Ok(HookResult::Clean);
        }

        self.logger.update_status(
            StatusUpdate::message(format!("Running {}", task.name()))
                .detail(format!("({} files)", accepted.len()))
                .phase(StatusPhase::Running),
        );
        let task_result = task.apply(&accepted).map_err(|source| HookError::Task {
            task: task.name().to_string(),
            entry: None,
            source,
        })?;
        debug!(task = task.name(), ?task_result, "repo task done");
        let task_result = self.check_rejected(task_result)?;

        let hook_result = if accepted.is_empty() {
            self.settle(task_result, None)?
        } else {
            let mut result = HookResult::Clean;
            for entry in &accepted {
                result = result.raise(self.settle(task_result, Some(entry))?);
            }
            result
        };
        self.logger.update_status(StatusUpdate {
            phase: Some(StatusPhase::Done(hook_result)),
            ..StatusUpdate::default()
        });
        Ok(hook_result)
    }

    fn check_rejected(&self, result: TaskResult) -> std::result::Result<TaskResult, Stop> {
        if result == TaskResult::Rejected && !self.continue_on_rejected {
            return Err(Stop::Rejected);
        }
        Ok(result)
    }

    /// Turn a task result into a run result, re-staging fixed files.
    fn settle(&self, result: TaskResult, entry: Option<&RepoEntry>) -> Result<HookResult> {
        match (result, entry) {
            (TaskResult::Accepted, _) => Ok(HookResult::Clean),
            (TaskResult::Modified, Some(entry)) if entry.partially_staged => {
                warn!(path = %entry.path, "fixed a partially staged file, leaving the fix unstaged");
                Ok(HookResult::HasUnstagedChanges)
            }
            (TaskResult::Modified, Some(entry)) => {
                self.repository
                    .stage(entry)
                    .map_err(|source| HookError::Stage {
                        path: entry.path.clone(),
                        source,
                    })?;
                debug!(path = %entry.path, "re-staged fixed file");
                Ok(HookResult::HasChanges)
            }
            (TaskResult::Modified, None) => Ok(HookResult::HasChanges),
            (TaskResult::Rejected, _) => {
                debug_assert!(
                    self.continue_on_rejected,
                    "rejections end the run unless continue_on_rejected is set"
                );
                Ok(HookResult::Rejected)
            }
        }
    }
}
