use dart_precommit::gate::{GateError, install_hook, uninstall_hook};
use std::fs;
use tempfile::TempDir;

/// Helper to create a git repository structure for testing
fn setup_test_repo() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    let git_dir = temp.path().join(".git");
    fs::create_dir(&git_dir).unwrap();
    fs::create_dir(git_dir.join("hooks")).unwrap();
    temp
}

#[test]
fn install_creates_hook() {
    let temp_repo = setup_test_repo();
    let repo_root = temp_repo.path();

    let hook_path = install_hook(repo_root).unwrap();

    assert_eq!(hook_path, repo_root.join(".git/hooks/pre-commit"));
    let content = fs::read_to_string(&hook_path).unwrap();
    assert!(content.starts_with("#!/bin/sh"), "Hook should have shebang");
    assert!(
        content.contains("Installed by dart-precommit"),
        "Hook should have marker comment"
    );
    assert!(
        content.contains("dart-precommit run"),
        "Hook should run the checks"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = fs::metadata(&hook_path).unwrap().permissions();
        assert!(permissions.mode() & 0o111 != 0, "Hook should be executable");
    }
}

#[test]
fn install_creates_missing_hooks_dir() {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir(temp.path().join(".git")).unwrap();

    install_hook(temp.path()).unwrap();

    assert!(temp.path().join(".git/hooks/pre-commit").exists());
}

#[test]
fn install_outside_repository_fails() {
    let temp = tempfile::tempdir().unwrap();
    assert!(matches!(
        install_hook(temp.path()),
        Err(GateError::NotARepo(_))
    ));
}

#[test]
fn install_backs_up_existing_hook() {
    let temp_repo = setup_test_repo();
    let repo_root = temp_repo.path();
    let hook_path = repo_root.join(".git/hooks/pre-commit");
    fs::write(&hook_path, "#!/bin/sh\necho 'existing hook'").unwrap();

    install_hook(repo_root).unwrap();

    let backup_path = repo_root.join(".git/hooks/pre-commit.backup");
    let backup_content = fs::read_to_string(&backup_path).unwrap();
    assert!(
        backup_content.contains("existing hook"),
        "Backup should contain original hook"
    );
}

#[test]
fn reinstall_keeps_original_backup() {
    let temp_repo = setup_test_repo();
    let repo_root = temp_repo.path();
    let hook_path = repo_root.join(".git/hooks/pre-commit");
    fs::write(&hook_path, "#!/bin/sh\necho 'existing hook'").unwrap();

    install_hook(repo_root).unwrap();
    install_hook(repo_root).unwrap();

    let backup_content =
        fs::read_to_string(repo_root.join(".git/hooks/pre-commit.backup")).unwrap();
    assert!(backup_content.contains("existing hook"));
}

#[test]
fn uninstall_removes_hook() {
    let temp_repo = setup_test_repo();
    let repo_root = temp_repo.path();
    let hook_path = install_hook(repo_root).unwrap();

    assert!(uninstall_hook(repo_root).unwrap());

    assert!(!hook_path.exists(), "Hook should be removed after uninstall");
}

#[test]
fn uninstall_restores_backup() {
    let temp_repo = setup_test_repo();
    let repo_root = temp_repo.path();
    let hook_path = repo_root.join(".git/hooks/pre-commit");
    fs::write(&hook_path, "#!/bin/sh\necho 'user hook'").unwrap();

    install_hook(repo_root).unwrap();
    assert!(uninstall_hook(repo_root).unwrap());

    let content = fs::read_to_string(&hook_path).unwrap();
    assert!(content.contains("user hook"));
    assert!(!repo_root.join(".git/hooks/pre-commit.backup").exists());
}

#[test]
fn uninstall_ignores_foreign_hooks() {
    let temp_repo = setup_test_repo();
    let repo_root = temp_repo.path();
    let hook_path = repo_root.join(".git/hooks/pre-commit");
    fs::write(&hook_path, "#!/bin/sh\necho 'user hook'").unwrap();

    assert!(!uninstall_hook(repo_root).unwrap());

    let content = fs::read_to_string(&hook_path).unwrap();
    assert!(
        content.contains("user hook"),
        "Original hook content should be preserved"
    );
}

#[test]
fn uninstall_without_hook_is_a_no_op() {
    let temp_repo = setup_test_repo();
    assert!(!uninstall_hook(temp_repo.path()).unwrap());
}
