// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counters and job tables shared between the polling loop and job tasks.

use jitr_core::{DaemonStatus, JobState, JobStatus};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Finished jobs kept for status reporting.
const RECENT_JOBS: usize = 20;

/// Outcome of asking for a dispatch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Admission {
    Admitted,
    /// The run already has a job.
    InFlight,
    /// The concurrency limit is reached.
    AtCapacity,
}

#[derive(Debug, Default)]
pub(super) struct SharedState {
    is_running: bool,
    started_at_ms: Option<u64>,
    active_jobs: BTreeMap<String, JobState>,
    in_flight: HashSet<u64>,
    last_poll_times: BTreeMap<String, u64>,
    total_completed: u64,
    total_failed: u64,
    recent_jobs: VecDeque<JobState>,
    last_job_id: u64,
}

impl SharedState {
    pub fn start(&mut self, now_ms: u64) {
        self.is_running = true;
        self.started_at_ms = Some(now_ms);
    }

    pub fn stop(&mut self) {
        self.is_running = false;
    }

    pub fn record_poll(&mut self, slug: String, now_ms: u64) {
        self.last_poll_times.insert(slug, now_ms);
    }

    /// Reserve a slot for `job`. The limit check and the reservation happen
    /// under one lock, so the active count never exceeds `max_concurrent`.
    pub fn admit(&mut self, job: &JobState, max_concurrent: usize) -> Admission {
        if self.in_flight.contains(&job.run_id) {
            return Admission::InFlight;
        }
        if self.active_jobs.len() >= max_concurrent {
            return Admission::AtCapacity;
        }
        self.in_flight.insert(job.run_id);
        self.active_jobs.insert(job.runner_name.clone(), job.clone());
        Admission::Admitted
    }

    /// Replace the active entry for a job that reported progress.
    pub fn update(&mut self, job: &JobState) {
        if let Some(active) = self.active_jobs.get_mut(&job.runner_name) {
            *active = job.clone();
        }
    }

    /// Retire a finished job and count its outcome.
    pub fn finish(&mut self, mut job: JobState) {
        if !job.is_terminal() {
            job.fail("job ended without a final status");
        }
        self.active_jobs.remove(&job.runner_name);
        self.in_flight.remove(&job.run_id);
        match job.status {
            JobStatus::Completed => self.total_completed += 1,
            _ => self.total_failed += 1,
        }
        self.recent_jobs.push_back(job);
        while self.recent_jobs.len() > RECENT_JOBS {
            self.recent_jobs.pop_front();
        }
    }

    /// Next dispatch-unique job number.
    pub fn next_job_id(&mut self) -> u64 {
        self.last_job_id += 1;
        self.last_job_id
    }

    pub fn snapshot(&self) -> DaemonStatus {
        DaemonStatus {
            is_running: self.is_running,
            started_at_ms: self.started_at_ms,
            active_jobs: self.active_jobs.clone(),
            last_poll_times: self.last_poll_times.clone(),
            total_completed: self.total_completed,
            total_failed: self.total_failed,
            recent_jobs: self.recent_jobs.iter().cloned().collect(),
        }
    }
}

/// Graceful shutdown request, observable by the sleeping poll loop.
#[derive(Debug, Default)]
pub(super) struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
