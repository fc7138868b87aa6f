use crate::process::{ProcessError, ProcessRunner};
use crate::task::{self, RepoTask, TaskError};
use crate::{RepoEntry, TaskResult};
use regex::Regex;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// Exit codes of `dart analyze`: 0 clean, 1 infos, 2 warnings, 3 errors.
///
/// The verdict comes from the reported issues, filtered to staged files, so
/// these codes only separate "analysis finished" from tool failures.
const ANALYSIS_FINISHED: RangeInclusive<i32> = 0..=3;

/// One issue from `dart analyze --format=machine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lint {
    pub severity: String,
    pub code: String,
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Lint {
    /// Parse `SEVERITY|TYPE|CODE|FILE|LINE|COLUMN|LENGTH|MESSAGE`.
    pub fn parse(line: &str) -> Option<Lint> {
        let mut fields = line.splitn(8, '|');
        let severity = fields.next()?;
        let _kind = fields.next()?;
        let code = fields.next()?;
        let path = fields.next()?;
        let line_no = fields.next()?.parse().ok()?;
        let column = fields.next()?.parse().ok()?;
        let _length = fields.next()?;
        let message = fields.next()?;

        Some(Lint {
            severity: severity.to_lowercase(),
            code: code.to_lowercase(),
            path: path.to_string(),
            line: line_no,
            column,
            message: message.replace("\\|", "|"),
        })
    }

    fn affects(&self, entry: &RepoEntry) -> bool {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path == entry.file
        } else {
            self.path.replace('\\', "/") == entry.path
        }
    }
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}:{}:{} - {} - {}",
            self.severity, self.path, self.line, self.column, self.message, self.code
        )
    }
}

/// Runs the Dart analyzer once and rejects if any staged file has issues.
pub struct AnalyzeTask {
    runner: Rc<dyn ProcessRunner>,
    pattern: Regex,
}

impl AnalyzeTask {
    pub fn new(runner: Rc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            pattern: task::pattern(r"\.dart$"),
        }
    }
}

impl RepoTask for AnalyzeTask {
    fn name(&self) -> &str {
        "analyze"
    }

    fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn apply(&self, entries: &[RepoEntry]) -> task::Result<TaskResult> {
        let mut lints = Vec::new();
        let lines = self
            .runner
            .stream("dart", &["analyze", "--fatal-infos", "--format=machine"])?;

        for line in lines {
            let line = match line {
                Ok(line) => line,
                Err(ProcessError::ExitStatus { program, code }) => {
                    if !ANALYSIS_FINISHED.contains(&code) {
                        return Err(TaskError::UnexpectedExitCode { program, code });
                    }
                    break;
                }
                Err(err) => return Err(err.into()),
            };

            let Some(lint) = Lint::parse(&line) else {
                debug!("skipping analyzer output: {}", line);
                continue;
            };
            if entries.iter().any(|entry| lint.affects(entry)) {
                lints.push(lint);
            }
        }

        for lint in &lints {
            warn!("{}", lint);
        }
        debug!(issues = lints.len(), files = entries.len(), "analysis finished");

        if lints.is_empty() {
            Ok(TaskResult::Accepted)
        } else {
            Ok(TaskResult::Rejected)
        }
    }
}
