// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process execution with cancellation and timeouts.
//!
//! Every external tool the executor drives (git, devcontainer, the container
//! engine) goes through a [`CommandRunner`], so tests can swap in
//! [`FakeRunner`] and assert on the exact argument shapes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from running a child process.
///
/// A non-zero exit is not an error; it is reported through [`CommandOutput`].
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting on `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {}s", after.as_secs())]
    TimedOut { command: String, after: Duration },
    #[error("`{command}` cancelled")]
    Cancelled { command: String },
}

impl ProcessError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled { .. })
    }
}

/// A command to run: program, arguments, environment and limits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// Values masked as `***` in [`CommandSpec::display`].
    pub secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), ..Self::default() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Register a value that must never appear in logs.
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    jitr_core::setters! {
        option {
            cwd: PathBuf,
            timeout: Duration,
        }
    }

    /// Command line for logs, with secrets masked.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        for secret in &self.secrets {
            line = line.replace(secret.as_str(), "***");
        }
        line
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: 0, stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self { exit_code, stdout: String::new(), stderr: stderr.into() }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, separated by a newline when both are present.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// Best diagnostic for a failure: stderr, falling back to stdout.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs external commands.
#[async_trait]
pub trait CommandRunner: Clone + Send + Sync + 'static {
    /// Run `spec` to completion, or until `cancel` fires or the spec's timeout elapses.
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ProcessError>;
}

/// Runs commands as real child processes via `tokio::process`.
///
/// Children are killed when the wait is abandoned (cancellation or timeout).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ProcessError> {
        let command = spec.display();
        tracing::debug!(%command, "running command");

        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd
            .spawn()
            .map_err(|source| ProcessError::Spawn { command: command.clone(), source })?;

        let waited = async {
            let output = match spec.timeout {
                Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                    .await
                    .map_err(|_| ProcessError::TimedOut { command: command.clone(), after: limit })?,
                None => child.wait_with_output().await,
            };
            output.map_err(|source| ProcessError::Wait { command: command.clone(), source })
        };

        let start = std::time::Instant::now();
        let result = tokio::select! {
            result = waited => result.map(CommandOutput::from),
            _ = cancel.cancelled() => Err(ProcessError::Cancelled { command: command.clone() }),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(out) => tracing::debug!(%command, exit_code = out.exit_code, elapsed_ms, "command finished"),
            Err(e) => tracing::warn!(%command, error = %e, elapsed_ms, "command did not finish"),
        }
        result
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::Semaphore;
    use tokio_util::sync::CancellationToken;

    struct Rule {
        pattern: String,
        reply: Reply,
        gate: Option<Arc<Semaphore>>,
    }

    #[derive(Clone)]
    enum Reply {
        Output(CommandOutput),
        SpawnError,
    }

    #[derive(Default)]
    struct FakeRunnerState {
        calls: Vec<CommandSpec>,
        rules: Vec<Rule>,
    }

    /// Scripted command runner for tests.
    ///
    /// Replies come from the most recently added rule whose pattern is a
    /// substring of the rendered command line; unmatched commands succeed
    /// with empty output.
    #[derive(Clone, Default)]
    pub struct FakeRunner {
        inner: Arc<Mutex<FakeRunnerState>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reply to commands containing `pattern` with `output`.
        pub fn on(&self, pattern: impl Into<String>, output: CommandOutput) -> &Self {
            self.push(pattern.into(), Reply::Output(output), None)
        }

        /// Like [`FakeRunner::on`], but each matching call waits for a permit on `gate`.
        pub fn on_gated(
            &self,
            pattern: impl Into<String>,
            output: CommandOutput,
            gate: Arc<Semaphore>,
        ) -> &Self {
            self.push(pattern.into(), Reply::Output(output), Some(gate))
        }

        /// Fail commands containing `pattern` as if the program were missing.
        pub fn on_spawn_error(&self, pattern: impl Into<String>) -> &Self {
            self.push(pattern.into(), Reply::SpawnError, None)
        }

        fn push(&self, pattern: String, reply: Reply, gate: Option<Arc<Semaphore>>) -> &Self {
            self.inner.lock().rules.push(Rule { pattern, reply, gate });
            self
        }

        /// All recorded calls, in order.
        pub fn calls(&self) -> Vec<CommandSpec> {
            self.inner.lock().calls.clone()
        }

        /// Rendered (secret-masked) command lines of all recorded calls.
        pub fn command_lines(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(CommandSpec::display).collect()
        }

        /// Recorded calls whose command line contains `pattern`.
        pub fn calls_matching(&self, pattern: &str) -> Vec<CommandSpec> {
            self.inner.lock().calls.iter().filter(|c| c.display().contains(pattern)).cloned().collect()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            spec: &CommandSpec,
            cancel: &CancellationToken,
        ) -> Result<CommandOutput, ProcessError> {
            let line = spec.display();
            let (reply, gate) = {
                let mut inner = self.inner.lock();
                inner.calls.push(spec.clone());
                match inner.rules.iter().rev().find(|r| line.contains(&r.pattern)) {
                    Some(rule) => (rule.reply.clone(), rule.gate.clone()),
                    None => (Reply::Output(CommandOutput::ok("")), None),
                }
            };

            if let Some(gate) = gate {
                tokio::select! {
                    permit = gate.acquire() => {
                        if let Ok(permit) = permit {
                            permit.forget();
                        }
                    }
                    _ = cancel.cancelled() => {
                        return Err(ProcessError::Cancelled { command: line });
                    }
                }
            }
            if cancel.is_cancelled() {
                return Err(ProcessError::Cancelled { command: line });
            }

            match reply {
                Reply::Output(output) => Ok(output),
                Reply::SpawnError => Err(ProcessError::Spawn {
                    command: line,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRunner;

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
