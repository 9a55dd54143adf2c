// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling daemon.
//!
//! One driver loop polls every enabled registration, admits queued runs up to
//! the concurrency limit and spawns a job task per run on a [`WorkerSet`].
//! Job tasks report back through shared state and the event channel; only
//! startup problems make [`Daemon::run`] return an error.

mod job_task;
mod state;

use crate::config::{ConfigError, ConfigSource};
use crate::executor::JobExecutor;
use crate::pool::NamedContainerPool;
use crate::worker_set::WorkerSet;
use jitr_adapters::{CiPlatform, CommandRunner};
use jitr_core::{Clock, DaemonStatus, JobState, Policy, QueuedWork, Registration};
use job_task::JobContext;
use parking_lot::Mutex;
use state::{Admission, SharedState, Shutdown};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 256;

/// Notifications published while the daemon runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    JobStarted(JobState),
    JobCompleted(JobState),
    StatusChanged(String),
}

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result of considering one queued run.
enum Dispatch {
    Started,
    Skipped,
    Failed,
    AtCapacity,
}

pub struct Daemon<P: CiPlatform, R: CommandRunner, C: Clock> {
    platform: P,
    executor: Arc<JobExecutor<R, C>>,
    pool: NamedContainerPool<C>,
    config: Arc<dyn ConfigSource>,
    clock: C,
    shared: Arc<Mutex<SharedState>>,
    events: broadcast::Sender<DaemonEvent>,
    shutdown: Shutdown,
}

impl<P: CiPlatform, R: CommandRunner, C: Clock> Daemon<P, R, C> {
    pub fn new(
        platform: P,
        executor: JobExecutor<R, C>,
        config: impl ConfigSource,
        clock: C,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            platform,
            executor: Arc::new(executor),
            pool: NamedContainerPool::new(clock.clone()),
            config: Arc::new(config),
            clock,
            shared: Arc::new(Mutex::new(SharedState::default())),
            events,
            shutdown: Shutdown::default(),
        }
    }

    /// Snapshot of the current state.
    pub fn status(&self) -> DaemonStatus {
        self.shared.lock().snapshot()
    }

    /// Stop dispatching. [`Daemon::run`] returns once running jobs finish.
    pub fn request_shutdown(&self) {
        tracing::info!("shutdown requested");
        self.shutdown.request();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DaemonEvent> {
        self.events.subscribe()
    }

    pub fn pool(&self) -> &NamedContainerPool<C> {
        &self.pool
    }

    pub fn executor(&self) -> &JobExecutor<R, C> {
        &self.executor
    }

    /// Validate credential, policy and registrations without starting.
    pub fn preflight(&self) -> Result<(), DaemonError> {
        self.load().map(|_| ())
    }

    /// Poll and dispatch until shutdown is requested or `cancel` fires,
    /// then wait for every dispatched job.
    ///
    /// Cancelling `cancel` also cancels running jobs; they still clean up.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), DaemonError> {
        let (registrations, policy) = self.load()?;
        self.shared.lock().start(self.clock.epoch_ms());
        tracing::info!(
            registrations = registrations.len(),
            max_concurrent_jobs = policy.max_concurrent_jobs,
            poll_interval_ms = policy.poll_interval.as_millis() as u64,
            "daemon started"
        );
        self.emit(DaemonEvent::StatusChanged("running".to_string()));

        if registrations.iter().any(|r| r.reuse_name().is_some()) {
            self.restore_named_containers(cancel).await;
        }

        let mut workers = WorkerSet::new();
        let mut last_summary = String::new();
        loop {
            let reaped = workers.reap().len();
            if reaped > 0 {
                tracing::debug!(reaped, running = workers.len(), "reaped job tasks");
            }
            if self.stopping(cancel) {
                break;
            }

            self.poll_cycle(&registrations, &policy, &mut workers, cancel).await;

            let summary = self.status().summary();
            if summary != last_summary {
                self.emit(DaemonEvent::StatusChanged(summary.clone()));
                last_summary = summary;
            }
            if self.stopping(cancel) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(policy.poll_interval) => {}
                _ = cancel.cancelled() => {}
                _ = self.shutdown.wait() => {}
            }
        }

        tracing::info!(running = workers.len(), "waiting for running jobs");
        workers.drain().await;
        self.shared.lock().stop();
        tracing::info!(summary = %self.status().summary(), "daemon stopped");
        self.emit(DaemonEvent::StatusChanged("stopped".to_string()));
        Ok(())
    }

    fn load(&self) -> Result<(Vec<Registration>, Policy), DaemonError> {
        if !self.platform.has_credential() {
            return Err(DaemonError::Configuration(
                "no platform token configured (set GITHUB_TOKEN)".to_string(),
            ));
        }
        let policy = self.config.load_policy()?;
        if policy.poll_interval.is_zero() {
            return Err(DaemonError::Configuration(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if policy.max_concurrent_jobs == 0 {
            return Err(DaemonError::Configuration(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        let registrations: Vec<_> =
            self.config.load_registrations()?.into_iter().filter(|r| r.enabled).collect();
        if registrations.is_empty() {
            return Err(DaemonError::Configuration("no enabled registrations".to_string()));
        }
        Ok((registrations, policy))
    }

    fn stopping(&self, cancel: &CancellationToken) -> bool {
        self.shutdown.is_requested() || cancel.is_cancelled()
    }

    async fn restore_named_containers(&self, cancel: &CancellationToken) {
        match self.executor.discover_named_containers(cancel).await {
            Ok(entries) => {
                for entry in entries {
                    self.pool.register(entry);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "named container discovery failed");
                self.emit(DaemonEvent::StatusChanged(format!("named container discovery failed: {}", e)));
            }
        }
    }

    async fn poll_cycle(
        &self,
        registrations: &[Registration],
        policy: &Policy,
        workers: &mut WorkerSet<()>,
        cancel: &CancellationToken,
    ) {
        for registration in registrations {
            if self.stopping(cancel) {
                return;
            }
            let slug = registration.slug();
            let queued = match self
                .platform
                .list_queued_work(&registration.owner, &registration.repository)
                .await
            {
                Ok(queued) => queued,
                Err(e) => {
                    tracing::warn!(%slug, error = %e, "poll failed");
                    self.emit(DaemonEvent::StatusChanged(format!("poll failed for {}: {}", slug, e)));
                    continue;
                }
            };
            self.shared.lock().record_poll(slug.clone(), self.clock.epoch_ms());
            tracing::debug!(%slug, queued = queued.len(), "polled");

            for work in &queued {
                if self.stopping(cancel) {
                    return;
                }
                match self.dispatch(registration, work, policy, workers, cancel).await {
                    Dispatch::Started | Dispatch::Skipped | Dispatch::Failed => {}
                    Dispatch::AtCapacity => {
                        tracing::debug!(
                            max_concurrent_jobs = policy.max_concurrent_jobs,
                            "at capacity, deferring remaining work"
                        );
                        return;
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        registration: &Registration,
        work: &QueuedWork,
        policy: &Policy,
        workers: &mut WorkerSet<()>,
        cancel: &CancellationToken,
    ) -> Dispatch {
        let now = self.clock.epoch_ms();
        let runner_name = agent_name(work.id, now);
        let mut job = JobState::new(registration.clone(), work.id, &work.head_branch, &runner_name, now);
        job.container_name = registration.reuse_name().map(str::to_string);

        let admission = self.shared.lock().admit(&job, policy.max_concurrent_jobs);
        match admission {
            Admission::Admitted => {}
            Admission::InFlight => return Dispatch::Skipped,
            Admission::AtCapacity => return Dispatch::AtCapacity,
        }

        let labels = registration.runner_labels();
        let credential = match self
            .platform
            .generate_ephemeral_credential(&registration.owner, &registration.repository, &runner_name, &labels)
            .await
        {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(run_id = work.id, slug = %registration.slug(), error = %e, "credential mint failed");
                job.fail(format!("failed to mint runner credential: {}", e));
                job.finish(self.clock.epoch_ms());
                self.job_context().complete(job);
                return Dispatch::Failed;
            }
        };

        tracing::info!(
            run_id = work.id,
            slug = %registration.slug(),
            runner = %runner_name,
            runner_id = credential.runner_id,
            labels = %labels.join(","),
            "dispatching job"
        );
        self.emit(DaemonEvent::JobStarted(job.clone()));
        workers.spawn(self.job_context().run(job, credential, cancel.child_token()));
        Dispatch::Started
    }

    fn job_context(&self) -> JobContext<R, C> {
        JobContext {
            executor: Arc::clone(&self.executor),
            pool: self.pool.clone(),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            clock: self.clock.clone(),
        }
    }

    fn emit(&self, event: DaemonEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Platform-unique agent name for a run dispatched at `now_ms`.
fn agent_name(run_id: u64, now_ms: u64) -> String {
    format!("jitr-{}-{}", run_id, now_ms)
}

#[cfg(test)]
#[path = "daemon_tests/mod.rs"]
mod tests;
