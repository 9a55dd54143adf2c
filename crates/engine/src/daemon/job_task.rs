// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Body of one spawned job task.

use super::state::SharedState;
use super::DaemonEvent;
use crate::executor::{ExistingContainer, JobExecutor, JobRequest, ProgressFn};
use crate::pool::NamedContainerPool;
use futures_util::FutureExt;
use jitr_adapters::CommandRunner;
use jitr_core::{Clock, EphemeralCredential, JobState, JobStatus, NamedContainerEntry};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Everything a job task needs, detached from the daemon's lifetime.
pub(super) struct JobContext<R: CommandRunner, C: Clock> {
    pub executor: Arc<JobExecutor<R, C>>,
    pub pool: NamedContainerPool<C>,
    pub shared: Arc<Mutex<SharedState>>,
    pub events: broadcast::Sender<DaemonEvent>,
    pub clock: C,
}

impl<R: CommandRunner, C: Clock> JobContext<R, C> {
    /// Execute `job` and retire it. A panic inside execution becomes a Failed job.
    pub async fn run(self, job: JobState, credential: EphemeralCredential, cancel: CancellationToken) {
        let result = AssertUnwindSafe(self.execute(&job, credential, &cancel)).catch_unwind().await;
        let finished = match result {
            Ok(state) => state,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(run_id = job.run_id, runner = %job.runner_name, %reason, "job task panicked");
                let mut failed = job;
                failed.fail(format!("job task panicked: {}", reason));
                failed.finish(self.clock.epoch_ms());
                failed
            }
        };
        self.complete(finished);
    }

    /// Retire a finished job: free its slot, count it and announce it.
    pub fn complete(&self, job: JobState) {
        let summary = {
            let mut shared = self.shared.lock();
            shared.finish(job.clone());
            shared.snapshot().summary()
        };
        tracing::info!(
            run_id = job.run_id,
            runner = %job.runner_name,
            status = %job.status,
            error = job.error.as_deref().unwrap_or(""),
            %summary,
            "job retired"
        );
        let _ = self.events.send(DaemonEvent::JobCompleted(job));
    }

    async fn execute(
        &self,
        job: &JobState,
        credential: EphemeralCredential,
        cancel: &CancellationToken,
    ) -> JobState {
        let request = JobRequest::new(
            job.registration.clone(),
            job.run_id,
            job.branch.clone(),
            job.runner_name.clone(),
        );
        let shared = Arc::clone(&self.shared);
        let on_progress = move |state: &JobState| shared.lock().update(state);

        match job.container_name.clone() {
            Some(name) => self.execute_named(job, request, name, credential, &on_progress, cancel).await,
            None => self.executor.execute_job(request, credential, &on_progress, cancel).await,
        }
    }

    /// Run under the pool lock for `name`, reusing the container when it is still up.
    async fn execute_named(
        &self,
        job: &JobState,
        request: JobRequest,
        name: String,
        credential: EphemeralCredential,
        on_progress: ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> JobState {
        let lease = match self.pool.acquire(&name, cancel).await {
            Ok(lease) => lease,
            Err(e) => {
                let mut failed = job.clone();
                failed.fail(e.to_string());
                failed.finish(self.clock.epoch_ms());
                return failed;
            }
        };

        if let Some(entry) = lease.entry() {
            if self.executor.container_running(&entry.container_id, cancel).await {
                let job_id = self.shared.lock().next_job_id();
                let target = ExistingContainer::new(job_id, entry.container_id, name);
                return self
                    .executor
                    .execute_job_in_existing_container(request, target, credential, on_progress, cancel)
                    .await;
            }
            tracing::warn!(
                name = %name,
                container_id = %entry.container_id,
                "named container is gone, provisioning a new one"
            );
            lease.evict();
        }

        let state = self
            .executor
            .execute_job(request.container_name(name.clone()), credential, on_progress, cancel)
            .await;
        // only containers that got as far as running the agent are worth reusing
        let provisioned = state.status == JobStatus::Completed || state.output.is_some();
        if let (Some(id), true) = (state.container_id.as_deref(), provisioned) {
            lease.register(NamedContainerEntry::new(
                name,
                id,
                &state.registration.owner,
                &state.registration.repository,
                self.clock.epoch_ms(),
            ));
        }
        state
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
