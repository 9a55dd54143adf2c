// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::OnceLock;

use assert_cmd::Command;
use tempfile::TempDir;

/// Environment the daemon reads; cleared so the host can't leak in.
const DAEMON_ENV: &[&str] = &[
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "JITR_GITHUB_API",
    "JITR_STATE_DIR",
    "JITR_CONFIG",
    "JITR_DRAIN_TIMEOUT_MS",
    "XDG_STATE_HOME",
    "RUST_LOG",
];

/// Path to the `jitrd` binary, building it on first use.
fn jitrd_bin() -> &'static Path {
    static BIN: OnceLock<PathBuf> = OnceLock::new();
    BIN.get_or_init(|| {
        let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
        let status = std::process::Command::new(cargo)
            .args(["build", "--quiet", "-p", "jitr-daemon", "--bin", "jitrd"])
            .current_dir(env!("CARGO_MANIFEST_DIR"))
            .status()
            .expect("failed to run cargo build");
        assert!(status.success(), "building jitrd failed");
        assert_cmd::cargo::cargo_bin("jitrd")
    })
}

/// A scratch state directory with an optional config file.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    pub fn with_config(config: &str) -> Self {
        let project = Self::empty();
        std::fs::write(project.config_path(), config).unwrap();
        project
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// `jitrd` pointed at this project, with no token.
    pub fn jitrd(&self) -> JitrdCommand {
        let mut cmd = Command::new(jitrd_bin());
        for key in DAEMON_ENV {
            cmd.env_remove(key);
        }
        cmd.env("JITR_STATE_DIR", self.state_dir()).env("JITR_CONFIG", self.config_path());
        JitrdCommand { cmd }
    }
}

pub struct JitrdCommand {
    cmd: Command,
}

impl JitrdCommand {
    pub fn token(mut self, token: &str) -> Self {
        self.cmd.env("GITHUB_TOKEN", token);
        self
    }

    /// Run and require a non-zero exit.
    pub fn fails(mut self) -> RunResult {
        let output = self.cmd.timeout(std::time::Duration::from_secs(30)).output().unwrap();
        assert!(
            !output.status.success(),
            "expected jitrd to fail\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunResult { output }
    }
}

pub struct RunResult {
    output: Output,
}

impl RunResult {
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr missing {expected:?}:\n{stderr}");
        self
    }
}
