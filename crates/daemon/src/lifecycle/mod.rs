// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: state directory, lock, logging, status file.

mod logging;
mod startup;
mod status;

pub use logging::init_logging;
pub use startup::{startup, DaemonLock};
pub use status::{spawn_status_writer, write_status};

use std::path::PathBuf;

use jitr_adapters::PlatformError;
use jitr_engine::{ConfigError, DaemonError};
use thiserror::Error;

use crate::env;

/// Daemon file layout
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/jitr)
    pub state_dir: PathBuf,
    /// TOML file with policy and registrations
    pub config_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Latest status snapshot, rewritten after every daemon event
    pub status_path: PathBuf,
}

impl Config {
    /// Resolve paths from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::at(env::state_dir()?))
    }

    pub fn at(state_dir: PathBuf) -> Self {
        Self {
            config_path: env::config_path(&state_dir),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            status_path: state_dir.join("status.json"),
            state_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory (set JITR_STATE_DIR or HOME)")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Missing prerequisites: {0}")]
    Prerequisites(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
