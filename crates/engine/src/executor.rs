// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor: clone, provision, install agent, run agent, clean up.
//!
//! A job never returns an error. Every failure is recorded on the returned
//! [`JobState`] and cleanup runs on every path, including cancellation.

mod commands;
mod outcome;

pub use commands::{AGENT_DIR, JOBS_DIR};
pub use outcome::ATTACH_MARKERS;

use jitr_adapters::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
use jitr_core::{Clock, EphemeralCredential, JobState, JobStatus, NamedContainerEntry, Registration};
use outcome::{classify_agent, parse_listing_line, parse_up_output, AgentOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Callback invoked whenever a job's state changes.
pub type ProgressFn<'a> = &'a (dyn Fn(&JobState) + Send + Sync);

/// Errors from executor operations outside job execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("`{command}` exited with code {exit_code}: {detail}")]
    CommandFailed { command: String, exit_code: i32, detail: String },
}

/// Why a job ended up Failed. Rendered into [`JobState::error`].
#[derive(Debug, Error)]
enum JobFailure {
    #[error("cancelled during {0}")]
    Cancelled(&'static str),
    #[error("{step} failed: {source}")]
    Process {
        step: &'static str,
        #[source]
        source: ProcessError,
    },
    #[error("{step} exited with code {exit_code}: {detail}")]
    Exit { step: &'static str, exit_code: i32, detail: String },
    #[error("failed to prepare {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Provision(String),
    #[error("{0}")]
    Agent(String),
}

impl JobFailure {
    fn exit(step: &'static str, output: &CommandOutput) -> Self {
        JobFailure::Exit { step, exit_code: output.exit_code, detail: output.failure_detail() }
    }
}

/// Tool locations, agent source and step limits.
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Container engine CLI (`docker`, `podman`, or a path).
    pub engine: String,
    pub devcontainer: String,
    pub git: String,
    /// Parent directory for per-job clones.
    pub work_root: PathBuf,
    pub agent_version: String,
    pub agent_download_base: String,
    /// Clone host, e.g. `https://github.com`.
    pub git_host: String,
    /// Token used to clone private repositories.
    pub token: Option<String>,
    pub clone_timeout: Duration,
    pub up_timeout: Duration,
    pub install_timeout: Duration,
    /// Limit for short engine calls (`rm`, `ps`, `inspect`, version probes).
    pub engine_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            devcontainer: "devcontainer".to_string(),
            git: "git".to_string(),
            work_root: std::env::temp_dir().join("jitr"),
            agent_version: "2.321.0".to_string(),
            agent_download_base: "https://github.com/actions/runner/releases/download".to_string(),
            git_host: "https://github.com".to_string(),
            token: None,
            clone_timeout: Duration::from_secs(10 * 60),
            up_timeout: Duration::from_secs(30 * 60),
            install_timeout: Duration::from_secs(10 * 60),
            engine_timeout: Duration::from_secs(60),
        }
    }
}

impl ExecutorConfig {
    jitr_core::setters! {
        into {
            engine: String,
            devcontainer: String,
            git: String,
            work_root: PathBuf,
            agent_version: String,
            agent_download_base: String,
            git_host: String,
        }
        set {
            clone_timeout: Duration,
            up_timeout: Duration,
            install_timeout: Duration,
            engine_timeout: Duration,
        }
        option {
            token: String,
        }
    }
}

impl fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("engine", &self.engine)
            .field("devcontainer", &self.devcontainer)
            .field("git", &self.git)
            .field("work_root", &self.work_root)
            .field("agent_version", &self.agent_version)
            .field("agent_download_base", &self.agent_download_base)
            .field("git_host", &self.git_host)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("clone_timeout", &self.clone_timeout)
            .field("up_timeout", &self.up_timeout)
            .field("install_timeout", &self.install_timeout)
            .field("engine_timeout", &self.engine_timeout)
            .finish()
    }
}

/// Which job to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub registration: Registration,
    pub run_id: u64,
    pub branch: String,
    pub runner_name: String,
    /// Reusable container name; `None` provisions a throwaway container.
    pub container_name: Option<String>,
}

impl JobRequest {
    pub fn new(
        registration: Registration,
        run_id: u64,
        branch: impl Into<String>,
        runner_name: impl Into<String>,
    ) -> Self {
        Self {
            registration,
            run_id,
            branch: branch.into(),
            runner_name: runner_name.into(),
            container_name: None,
        }
    }

    jitr_core::setters! {
        option { container_name: String }
    }

    fn into_state(self, now_ms: u64) -> JobState {
        let mut job = JobState::new(self.registration, self.run_id, self.branch, self.runner_name, now_ms);
        job.container_name = self.container_name.filter(|n| !n.trim().is_empty());
        job
    }
}

/// A running container to execute a job in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingContainer {
    pub job_id: u64,
    pub container_id: String,
    pub container_name: String,
    /// Clone the container was provisioned from, if still on disk.
    pub clone_path: Option<PathBuf>,
}

impl ExistingContainer {
    pub fn new(job_id: u64, container_id: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            job_id,
            container_id: container_id.into(),
            container_name: container_name.into(),
            clone_path: None,
        }
    }

    jitr_core::setters! {
        option { clone_path: PathBuf }
    }
}

/// Result of probing for the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisites {
    pub engine_available: bool,
    pub devcontainer_available: bool,
    pub error: Option<String>,
}

impl Prerequisites {
    pub fn is_ready(&self) -> bool {
        self.engine_available && self.devcontainer_available
    }
}

/// Runs jobs through a [`CommandRunner`].
pub struct JobExecutor<R: CommandRunner, C: Clock> {
    runner: R,
    clock: C,
    config: ExecutorConfig,
}

impl<R: CommandRunner, C: Clock> JobExecutor<R, C> {
    pub fn new(runner: R, clock: C, config: ExecutorConfig) -> Self {
        Self { runner, clock, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a job in a freshly provisioned container.
    ///
    /// With a container name the container is labelled for reuse and kept;
    /// without one it is removed along with the clone.
    pub async fn execute_job(
        &self,
        request: JobRequest,
        credential: EphemeralCredential,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> JobState {
        let mut job = request.into_state(self.clock.epoch_ms());
        tracing::info!(
            run_id = job.run_id,
            runner = %job.runner_name,
            slug = %job.registration.slug(),
            branch = %job.branch,
            container_name = job.container_name.as_deref().unwrap_or(""),
            "starting job"
        );
        on_progress(&job);

        if let Err(failure) = self.provision_and_run(&mut job, credential, on_progress, cancel).await {
            tracing::warn!(run_id = job.run_id, runner = %job.runner_name, error = %failure, "job failed");
            job.fail(failure.to_string());
        }
        self.cleanup(&job).await;
        self.finish(job, on_progress)
    }

    /// Run a job inside a container that is already up.
    ///
    /// The agent is installed into a directory unique to this job, and only
    /// that directory is removed afterwards; the container keeps running.
    pub async fn execute_job_in_existing_container(
        &self,
        request: JobRequest,
        target: ExistingContainer,
        credential: EphemeralCredential,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> JobState {
        let mut job = request.into_state(self.clock.epoch_ms());
        job.workflow_job_id = Some(target.job_id);
        job.container_id = Some(target.container_id.clone());
        job.container_name = Some(target.container_name);
        job.clone_path = target.clone_path;
        job.advance(JobStatus::Building);
        tracing::info!(
            run_id = job.run_id,
            job_id = target.job_id,
            runner = %job.runner_name,
            container_id = %target.container_id,
            "starting job in existing container"
        );
        on_progress(&job);

        let dir = job_dir(job.run_id, target.job_id);
        if let Err(failure) = self
            .install_and_run(&mut job, &target.container_id, &dir, credential, on_progress, cancel)
            .await
        {
            tracing::warn!(run_id = job.run_id, runner = %job.runner_name, error = %failure, "job failed");
            job.fail(failure.to_string());
        }

        let cleanup = CancellationToken::new();
        let stop = commands::stop_processes_in_container(&self.config, &target.container_id, &dir);
        self.best_effort(&stop, &cleanup).await;
        let remove = commands::remove_dir_in_container(&self.config, &target.container_id, &dir);
        self.best_effort(&remove, &cleanup).await;
        self.finish(job, on_progress)
    }

    /// Remove what a job left behind.
    ///
    /// Named containers are kept; anonymous ones are removed. The clone
    /// directory is always removed. Failures are logged, never returned.
    pub async fn cleanup(&self, job: &JobState) {
        let cancel = CancellationToken::new();
        let named = job.container_name.as_deref().is_some_and(|n| !n.trim().is_empty());
        if !named {
            if let Some(id) = job.container_id.as_deref() {
                self.best_effort(&commands::remove_container(&self.config, id), &cancel).await;
            }
        }
        if let Some(path) = job.clone_path.as_deref() {
            remove_dir(path).await;
        }
    }

    /// Probe the container engine and devcontainer CLI.
    pub async fn check_prerequisites(&self, cancel: &CancellationToken) -> Prerequisites {
        let engine = self.probe(&commands::engine_version(&self.config), cancel).await;
        let devcontainer = self.probe(&commands::devcontainer_version(&self.config), cancel).await;

        let mut problems = Vec::new();
        if let Err(e) = &engine {
            problems.push(format!("{} is not available: {}", self.config.engine, e));
        }
        if let Err(e) = &devcontainer {
            problems.push(format!("{} is not available: {}", self.config.devcontainer, e));
        }
        Prerequisites {
            engine_available: engine.is_ok(),
            devcontainer_available: devcontainer.is_ok(),
            error: (!problems.is_empty()).then(|| problems.join("; ")),
        }
    }

    /// Containers carrying the pool name label, as found on the engine.
    pub async fn discover_named_containers(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<NamedContainerEntry>, ExecutorError> {
        let spec = commands::list_named(&self.config);
        let out = self.runner.run(&spec, cancel).await?;
        if !out.success() {
            return Err(ExecutorError::CommandFailed {
                command: spec.display(),
                exit_code: out.exit_code,
                detail: out.failure_detail(),
            });
        }
        let now = self.clock.epoch_ms();
        let entries: Vec<_> = out.stdout.lines().filter_map(|line| parse_listing_line(line, now)).collect();
        tracing::info!(count = entries.len(), "discovered named containers");
        Ok(entries)
    }

    /// Whether the engine reports the container as running.
    pub async fn container_running(&self, container_id: &str, cancel: &CancellationToken) -> bool {
        match self.runner.run(&commands::inspect_running(&self.config, container_id), cancel).await {
            Ok(out) => out.success() && out.stdout.trim() == "true",
            Err(e) => {
                tracing::debug!(container_id, error = %e, "container inspect failed");
                false
            }
        }
    }

    async fn provision_and_run(
        &self,
        job: &mut JobState,
        credential: EphemeralCredential,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), JobFailure> {
        let work_root = &self.config.work_root;
        tokio::fs::create_dir_all(work_root)
            .await
            .map_err(|source| JobFailure::Workspace { path: work_root.clone(), source })?;

        let dest = work_root.join(&job.runner_name);
        let clone = commands::clone(&self.config, &job.registration, &job.branch, &dest);
        if let Err(failure) = self.checked_step("clone", &clone, cancel).await {
            // partial clone
            remove_dir(&dest).await;
            return Err(failure);
        }
        job.clone_path = Some(dest.clone());
        job.advance(JobStatus::Building);
        on_progress(job);

        let up = commands::up(&self.config, &dest, &job.registration, job.container_name.as_deref());
        let out = self.step("devcontainer up", &up, cancel).await?;
        let result = parse_up_output(&out.stdout);
        if let Some(id) = &result.container_id {
            job.container_id = Some(id.clone());
            on_progress(job);
        }
        if !out.success() {
            return Err(JobFailure::exit("devcontainer up", &out));
        }
        let container_id = result.into_container_id().map_err(JobFailure::Provision)?;
        tracing::info!(run_id = job.run_id, %container_id, "container up");

        self.install_and_run(job, &container_id, AGENT_DIR, credential, on_progress, cancel).await
    }

    async fn install_and_run(
        &self,
        job: &mut JobState,
        container_id: &str,
        dir: &str,
        credential: EphemeralCredential,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), JobFailure> {
        let install = commands::install_agent(&self.config, container_id, dir);
        self.checked_step("agent install", &install, cancel).await?;
        job.advance(JobStatus::Running);
        on_progress(job);

        let encoded = credential.into_encoded_config();
        let run = commands::run_agent(&self.config, container_id, dir, &encoded);
        let out = self.step("agent", &run, cancel).await?;
        job.set_output(&out.combined());
        match classify_agent(&out) {
            AgentOutcome::Completed => {
                job.complete();
                Ok(())
            }
            AgentOutcome::Failed(reason) => Err(JobFailure::Agent(reason)),
        }
    }

    async fn step(
        &self,
        step: &'static str,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, JobFailure> {
        if cancel.is_cancelled() {
            return Err(JobFailure::Cancelled(step));
        }
        match self.runner.run(spec, cancel).await {
            Ok(out) => Ok(out),
            Err(e) if e.is_cancelled() => Err(JobFailure::Cancelled(step)),
            Err(source) => Err(JobFailure::Process { step, source }),
        }
    }

    /// Like [`Self::step`], but a non-zero exit is a failure.
    async fn checked_step(
        &self,
        step: &'static str,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, JobFailure> {
        let out = self.step(step, spec, cancel).await?;
        if out.success() {
            Ok(out)
        } else {
            Err(JobFailure::exit(step, &out))
        }
    }

    async fn best_effort(&self, spec: &CommandSpec, cancel: &CancellationToken) {
        match self.runner.run(spec, cancel).await {
            Ok(out) if out.success() => {}
            Ok(out) => tracing::warn!(
                command = %spec.display(),
                exit_code = out.exit_code,
                detail = %out.failure_detail(),
                "cleanup command failed"
            ),
            Err(e) => tracing::warn!(command = %spec.display(), error = %e, "cleanup command failed"),
        }
    }

    async fn probe(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<String, String> {
        match self.runner.run(spec, cancel).await {
            Ok(out) if out.success() => Ok(out.stdout.trim().to_string()),
            Ok(out) => {
                let detail = out.failure_detail();
                Err(if detail.is_empty() { format!("exit code {}", out.exit_code) } else { detail })
            }
            Err(e) => Err(e.to_string()),
        }
    }

    fn finish(&self, mut job: JobState, on_progress: ProgressFn<'_>) -> JobState {
        job.finish(self.clock.epoch_ms());
        tracing::info!(
            run_id = job.run_id,
            runner = %job.runner_name,
            status = %job.status,
            "job finished"
        );
        on_progress(&job);
        job
    }
}

/// Per-job agent directory inside a reused container.
fn job_dir(run_id: u64, job_id: u64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}/{}-{}-{}", JOBS_DIR, run_id, job_id, &suffix[..8])
}

async fn remove_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove directory"),
    }
}

#[cfg(test)]
#[path = "executor_tests/mod.rs"]
mod tests;
