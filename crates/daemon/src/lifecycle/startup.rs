// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: state directory and single-instance lock.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use fs2::FileExt;
use tracing::{info, warn};

use super::{Config, LifecycleError};

/// Exclusive hold on `daemon.pid`; the lock is released on drop.
#[derive(Debug)]
pub struct DaemonLock {
    path: PathBuf,
    // NOTE(lifetime): held to keep the exclusive file lock
    _file: File,
}

impl DaemonLock {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Remove the PID file, then drop the lock.
    pub fn release(self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "removed pid file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove pid file"),
        }
    }
}

/// Create the state directory and take the daemon lock.
pub fn startup(config: &Config) -> Result<DaemonLock, LifecycleError> {
    match startup_inner(config) {
        Ok(lock) => Ok(lock),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock: the PID file
            // belongs to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<DaemonLock, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Open without truncating so a running daemon's PID survives a failed attempt.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    Ok(DaemonLock { path: config.lock_path.clone(), _file: lock_file })
}

fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
