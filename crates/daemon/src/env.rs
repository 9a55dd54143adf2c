// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: JITR_STATE_DIR > XDG_STATE_HOME/jitr > ~/.local/state/jitr
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = non_empty("JITR_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("jitr"));
    }
    let home = non_empty("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/jitr"))
}

/// Config file: JITR_CONFIG, else `config.toml` in the state directory.
pub fn config_path(state_dir: &Path) -> PathBuf {
    non_empty("JITR_CONFIG").map(PathBuf::from).unwrap_or_else(|| state_dir.join("config.toml"))
}

/// Platform token: GITHUB_TOKEN, then GH_TOKEN.
pub fn github_token() -> Option<String> {
    non_empty("GITHUB_TOKEN").or_else(|| non_empty("GH_TOKEN"))
}

/// API root override for GitHub Enterprise Server.
pub fn github_api_url() -> Option<String> {
    non_empty("JITR_GITHUB_API")
}

/// How long cancelled jobs get to clean up after the second signal (default 30s).
pub fn drain_timeout() -> Duration {
    std::env::var("JITR_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
