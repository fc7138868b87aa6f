use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const HOOK_MARKER: &str = "# Installed by dart-precommit";
const HOOK_CONTENT: &str = "#!/bin/sh
# Installed by dart-precommit
exec dart-precommit run
";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("{} is not a git repository", .0.display())]
    NotARepo(PathBuf),
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GateError>;

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> GateError {
    let path = path.to_path_buf();
    move |source| GateError::Io {
        action,
        path,
        source,
    }
}

fn is_ours(hook_path: &Path) -> bool {
    fs::read_to_string(hook_path)
        .map(|content| content.contains(HOOK_MARKER))
        .unwrap_or(false)
}

/// Install the pre-commit hook that runs the checks.
///
/// A foreign pre-commit hook is backed up to `.git/hooks/pre-commit.backup`.
/// Reinstalling over our own hook does not touch an existing backup.
pub fn install_hook(repo_root: &Path) -> Result<PathBuf> {
    let git_dir = repo_root.join(".git");
    if !git_dir.is_dir() {
        return Err(GateError::NotARepo(repo_root.to_path_buf()));
    }
    let hooks_dir = git_dir.join("hooks");
    let hook_path = hooks_dir.join("pre-commit");
    let backup_path = hooks_dir.join("pre-commit.backup");

    fs::create_dir_all(&hooks_dir).map_err(io_error("create", &hooks_dir))?;

    if hook_path.exists() && !is_ours(&hook_path) {
        fs::copy(&hook_path, &backup_path).map_err(io_error("back up", &hook_path))?;
    }

    fs::write(&hook_path, HOOK_CONTENT).map_err(io_error("write", &hook_path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&hook_path)
            .map_err(io_error("inspect", &hook_path))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook_path, perms).map_err(io_error("chmod", &hook_path))?;
    }

    Ok(hook_path)
}

/// Remove the pre-commit hook if we installed it, restoring any backup.
///
/// Returns whether a hook was removed. User-written hooks are left alone.
pub fn uninstall_hook(repo_root: &Path) -> Result<bool> {
    let hooks_dir = repo_root.join(".git/hooks");
    let hook_path = hooks_dir.join("pre-commit");
    let backup_path = hooks_dir.join("pre-commit.backup");

    if !hook_path.exists() || !is_ours(&hook_path) {
        return Ok(false);
    }

    if backup_path.exists() {
        fs::rename(&backup_path, &hook_path).map_err(io_error("restore", &backup_path))?;
    } else {
        fs::remove_file(&hook_path).map_err(io_error("remove", &hook_path))?;
    }

    Ok(true)
}
