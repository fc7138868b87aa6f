use crate::RepoEntry;
use crate::process::{ProcessError, ProcessRunner};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not in a git repository")]
    NotARepo,
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub type Result<T> = std::result::Result<T, GitError>;

/// Source of staged files and sink for re-staged fixes.
pub trait Repository {
    /// Staged files that exist and lie inside the package directory.
    fn staged_entries(&self) -> Result<Vec<RepoEntry>>;

    /// Add the current content of `entry` to the index.
    fn stage(&self, entry: &RepoEntry) -> Result<()>;
}

/// [`Repository`] backed by the `git` command line.
pub struct GitRepository {
    runner: Rc<dyn ProcessRunner>,
    package_dir: PathBuf,
}

impl GitRepository {
    /// `package_dir` must be absolute; `runner` should run inside it.
    pub fn new(runner: Rc<dyn ProcessRunner>, package_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            package_dir: package_dir.into(),
        }
    }

    /// Find the root of the git repository.
    pub fn find_repo_root(&self) -> Result<PathBuf> {
        let lines = self.lines(&["rev-parse", "--show-toplevel"]).map_err(|err| {
            debug!("git rev-parse failed: {}", err);
            GitError::NotARepo
        })?;
        lines
            .into_iter()
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or(GitError::NotARepo)
    }

    fn lines(&self, args: &[&str]) -> Result<Vec<String>> {
        self.runner
            .stream("git", args)?
            .map(|line| line.map_err(GitError::from))
            .collect()
    }

    /// Paths listed by a `-z` invocation; NUL separated and never quoted.
    fn changed_paths(&self, args: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .lines(args)?
            .join("\n")
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl Repository for GitRepository {
    fn staged_entries(&self) -> Result<Vec<RepoEntry>> {
        let repo_root = self.find_repo_root()?;
        let staged = self.changed_paths(&["diff", "--name-only", "-z", "--cached"])?;
        let unstaged: HashSet<String> = self
            .changed_paths(&["diff", "--name-only", "-z"])?
            .into_iter()
            .collect();

        let mut entries = Vec::new();
        for path in staged {
            let file = repo_root.join(&path);
            let Some(relative) = package_relative(&self.package_dir, &file) else {
                debug!(%path, "outside of package, skipping");
                continue;
            };
            if !file.is_file() {
                debug!(%path, "no longer exists, skipping");
                continue;
            }
            let partially_staged = unstaged.contains(&path);
            entries.push(RepoEntry::new(&self.package_dir, &relative, partially_staged));
        }
        Ok(entries)
    }

    fn stage(&self, entry: &RepoEntry) -> Result<()> {
        let file = entry.file.to_string_lossy();
        let code = self.runner.run("git", &["add", file.as_ref()])?;
        if code != 0 {
            return Err(GitError::CommandFailed(format!(
                "git add {} exited with code {}",
                entry.path, code
            )));
        }
        Ok(())
    }
}

/// Path of `file` relative to `package_dir`, if it lies inside it.
fn package_relative(package_dir: &Path, file: &Path) -> Option<PathBuf> {
    file.strip_prefix(package_dir)
        .ok()
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
