pub mod analyze;
pub mod cli;
pub mod config;
pub mod format;
pub mod gate;
pub mod git;
pub mod hook;
pub mod imports;
pub mod logger;
pub mod process;
pub mod task;

use std::path::{Path, PathBuf};

/// Outcome of a single task invocation.
///
/// Variants are declared in ascending severity; the derived `Ord` is the
/// lattice order used by [`TaskResult::raise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskResult {
    /// No issue found.
    Accepted,
    /// The task rewrote the file and the rewrite is acceptable.
    Modified,
    /// An issue was found that cannot be fixed automatically.
    Rejected,
}

impl TaskResult {
    /// Merge two results, keeping the more severe one.
    pub fn raise(self, other: TaskResult) -> TaskResult {
        self.max(other)
    }
}

/// Outcome of a whole run, or of one entry within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookResult {
    Clean,
    HasChanges,
    /// A fix touched a partially staged file and could not be re-staged.
    HasUnstagedChanges,
    Rejected,
}

impl HookResult {
    /// Merge two results, keeping the more severe one. `Clean` is the identity.
    pub fn raise(self, other: HookResult) -> HookResult {
        self.max(other)
    }

    /// Fold a sequence of results starting from `Clean`.
    pub fn fold<I: IntoIterator<Item = HookResult>>(results: I) -> HookResult {
        results.into_iter().fold(HookResult::Clean, HookResult::raise)
    }

    /// Whether the commit may proceed.
    pub fn is_success(self) -> bool {
        matches!(self, HookResult::Clean | HookResult::HasChanges)
    }

    /// Process exit code for this result.
    ///
    /// With `detailed` every variant gets its own code (0-3), otherwise only
    /// success (0) and failure (1) are distinguished.
    pub fn exit_code(self, detailed: bool) -> i32 {
        if detailed {
            match self {
                HookResult::Clean => 0,
                HookResult::HasChanges => 1,
                HookResult::HasUnstagedChanges => 2,
                HookResult::Rejected => 3,
            }
        } else if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// A staged file discovered at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    /// Absolute path used for reading and writing the file.
    pub file: PathBuf,
    /// Path relative to the package root, `/`-separated. Task patterns match
    /// against this.
    pub path: String,
    /// The file has both staged and unstaged modifications.
    pub partially_staged: bool,
}

impl RepoEntry {
    /// Build an entry for `relative` inside `root`.
    pub fn new(root: &Path, relative: &Path, partially_staged: bool) -> Self {
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            file: root.join(relative),
            path,
            partially_staged,
        }
    }
}
