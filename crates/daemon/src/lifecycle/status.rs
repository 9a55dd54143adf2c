// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log and `status.json` writer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jitr_adapters::{CiPlatform, CommandRunner};
use jitr_core::{Clock, DaemonStatus, JobStatus};
use jitr_engine::{Daemon, DaemonEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Atomically replace `path` with the pretty-printed status.
pub fn write_status(path: &Path, status: &DaemonStatus) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(status).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}

/// Log every daemon event and rewrite the status file after each one.
///
/// The task holds the daemon and runs until aborted.
pub fn spawn_status_writer<P, R, C>(daemon: Arc<Daemon<P, R, C>>, path: PathBuf) -> JoinHandle<()>
where
    P: CiPlatform,
    R: CommandRunner,
    C: Clock,
{
    let mut events = daemon.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "status writer fell behind"),
                Err(RecvError::Closed) => break,
            }
            if let Err(e) = write_status(&path, &daemon.status()) {
                warn!(path = %path.display(), error = %e, "failed to write status file");
            }
        }
    })
}

fn log_event(event: &DaemonEvent) {
    match event {
        DaemonEvent::JobStarted(job) => info!(
            run_id = job.run_id,
            repo = %job.registration.slug(),
            runner = %job.runner_name,
            "job started"
        ),
        DaemonEvent::JobCompleted(job) if job.status == JobStatus::Completed => info!(
            run_id = job.run_id,
            repo = %job.registration.slug(),
            runner = %job.runner_name,
            "job completed"
        ),
        DaemonEvent::JobCompleted(job) => warn!(
            run_id = job.run_id,
            repo = %job.registration.slug(),
            runner = %job.runner_name,
            error = job.error.as_deref().unwrap_or(""),
            "job failed"
        ),
        DaemonEvent::StatusChanged(message) => info!(status = %message, "daemon status"),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
