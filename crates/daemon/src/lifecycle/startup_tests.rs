// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn startup_creates_state_dir_and_writes_pid() {
    let dir = tempdir().unwrap();
    let config = Config::at(dir.path().join("nested/state"));

    let lock = startup(&config).unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(lock.path(), config.lock_path.as_path());
}

#[test]
fn second_startup_fails_and_keeps_pid_file() {
    let dir = tempdir().unwrap();
    let config = Config::at(dir.path().to_path_buf());
    let _lock = startup(&config).unwrap();

    let err = startup(&config).unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)), "{err:?}");
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[test]
fn release_removes_pid_file_and_allows_restart() {
    let dir = tempdir().unwrap();
    let config = Config::at(dir.path().to_path_buf());

    startup(&config).unwrap().release();
    assert!(!config.lock_path.exists());

    let again = startup(&config).unwrap();
    again.release();
}

#[test]
fn stale_pid_file_is_overwritten() {
    let dir = tempdir().unwrap();
    let config = Config::at(dir.path().to_path_buf());
    std::fs::write(&config.lock_path, "999999999\nleftover\n").unwrap();

    let _lock = startup(&config).unwrap();
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid, format!("{}\n", std::process::id()));
}
