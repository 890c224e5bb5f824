#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

use tempfile::TempDir;

#[test]
fn test_env_dir_is_under_workspace_root() {
    let bootstrap = Bootstrap::new("/work");
    assert_eq!(bootstrap.env_dir(), PathBuf::from("/work/.testenv"));
}

#[test]
fn test_runner_defaults_to_tool_name() {
    let root = TempDir::new().unwrap();
    let bootstrap = Bootstrap::new(root.path());
    assert_eq!(bootstrap.select_runner(), PathBuf::from("cargo"));
}

#[test]
fn test_env_local_runner_is_preferred() {
    let root = TempDir::new().unwrap();
    let bin = root.path().join(ENV_DIR).join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let local = bin.join("cargo");
    std::fs::write(&local, "").unwrap();

    let bootstrap = Bootstrap::new(root.path());
    assert_eq!(bootstrap.select_runner(), local);
}

#[test]
fn test_tool_lookup_uses_path_override() {
    let dir = TempDir::new().unwrap();
    let tool = dir.path().join("cargo");
    std::fs::write(&tool, "").unwrap();

    let found = Bootstrap::new("/work")
        .path_override(dir.path())
        .find_tool_on_path();
    assert_eq!(found, Some(tool));

    let empty = TempDir::new().unwrap();
    let missing = Bootstrap::new("/work")
        .path_override(empty.path())
        .find_tool_on_path();
    assert!(missing.is_none());
}

#[test]
fn test_missing_lock_file_error_names_the_path() {
    let root = TempDir::new().unwrap();
    let err = Bootstrap::new(root.path())
        .path_override(root.path())
        .run()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains(LOCK_FILE), "message: {}", message);
    assert!(message.contains("workspace root"), "message: {}", message);
}

#[test]
fn test_missing_installer_error_carries_install_hint() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join(LOCK_FILE), "").unwrap();
    let empty = TempDir::new().unwrap();

    let err = Bootstrap::new(root.path())
        .path_override(empty.path())
        .run()
        .unwrap_err();
    assert!(err.to_string().contains("rustup.rs"), "message: {}", err);
}
