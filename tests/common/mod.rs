//! Shared fakes for the hook integration tests.
#![allow(dead_code)]

use dart_precommit::git::{self, GitError, Repository};
use dart_precommit::logger::{Logger, StatusUpdate};
use dart_precommit::task::{self, FileTask, RepoTask, TaskError};
use dart_precommit::{RepoEntry, TaskResult};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Ordered record of task invocations shared by all fakes in a test.
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Repository with a fixed set of staged entries that records `stage` calls.
#[derive(Default)]
pub struct FakeRepository {
    pub entries: Vec<RepoEntry>,
    pub staged: RefCell<Vec<String>>,
    pub fail_discovery: bool,
}

impl FakeRepository {
    pub fn new(root: &Path, paths: &[(&str, bool)]) -> Self {
        Self {
            entries: paths
                .iter()
                .map(|(path, partial)| RepoEntry::new(root, Path::new(path), *partial))
                .collect(),
            ..Self::default()
        }
    }

    pub fn staged(&self) -> Vec<String> {
        self.staged.borrow().clone()
    }
}

impl Repository for FakeRepository {
    fn staged_entries(&self) -> git::Result<Vec<RepoEntry>> {
        if self.fail_discovery {
            return Err(GitError::NotARepo);
        }
        Ok(self.entries.clone())
    }

    fn stage(&self, entry: &RepoEntry) -> git::Result<()> {
        self.staged.borrow_mut().push(entry.path.clone());
        Ok(())
    }
}

/// Logger that keeps every update and counts completions.
#[derive(Default)]
pub struct RecordingLogger {
    pub updates: RefCell<Vec<StatusUpdate>>,
    pub completed: RefCell<usize>,
}

impl RecordingLogger {
    pub fn completed(&self) -> usize {
        *self.completed.borrow()
    }
}

impl Logger for RecordingLogger {
    fn update_status(&self, update: StatusUpdate) {
        self.updates.borrow_mut().push(update);
    }

    fn complete_status(&self) {
        *self.completed.borrow_mut() += 1;
    }
}

/// File task returning a scripted result per entry path.
pub struct ScriptedFileTask {
    pub name: String,
    pub pattern: Regex,
    pub results: HashMap<String, TaskResult>,
    pub fail_on: Option<String>,
    pub log: CallLog,
}

impl ScriptedFileTask {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            pattern: Regex::new(".*").unwrap(),
            results: HashMap::new(),
            fail_on: None,
            log: log.clone(),
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Regex::new(pattern).unwrap();
        self
    }

    pub fn result(mut self, path: &str, result: TaskResult) -> Self {
        self.results.insert(path.to_string(), result);
        self
    }

    pub fn fail_on(mut self, path: &str) -> Self {
        self.fail_on = Some(path.to_string());
        self
    }
}

impl FileTask for ScriptedFileTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn apply(&self, entry: &RepoEntry) -> task::Result<TaskResult> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, entry.path));
        if self.fail_on.as_deref() == Some(entry.path.as_str()) {
            return Err(TaskError::Malformed(format!("cannot parse {}", entry.path)));
        }
        Ok(self
            .results
            .get(&entry.path)
            .copied()
            .unwrap_or(TaskResult::Accepted))
    }
}

/// Repo task returning one fixed result.
pub struct ScriptedRepoTask {
    pub name: String,
    pub pattern: Regex,
    pub result: TaskResult,
    pub call_for_empty: bool,
    pub log: CallLog,
}

impl ScriptedRepoTask {
    pub fn new(name: &str, result: TaskResult, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            pattern: Regex::new(".*").unwrap(),
            result,
            call_for_empty: false,
            log: log.clone(),
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Regex::new(pattern).unwrap();
        self
    }

    pub fn call_for_empty(mut self) -> Self {
        self.call_for_empty = true;
        self
    }
}

impl RepoTask for ScriptedRepoTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn call_for_empty_entries(&self) -> bool {
        self.call_for_empty
    }

    fn apply(&self, entries: &[RepoEntry]) -> task::Result<TaskResult> {
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        self.log
            .borrow_mut()
            .push(format!("{}:[{}]", self.name, paths.join(",")));
        Ok(self.result)
    }
}
