// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state machine for one dispatched workflow run.

use crate::registration::Registration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum captured agent output kept on a job (tail).
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Lifecycle phase of a job. Variants are declared in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Cloning the repository
    Cloning,
    /// Bringing up the devcontainer and installing the agent
    Building,
    /// Agent is running
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

crate::simple_display! {
    JobStatus {
        Cloning => "cloning",
        Building => "building",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// State of a single job execution.
///
/// Owned by the task executing the job; the daemon only ever sees clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    pub registration: Registration,
    pub run_id: u64,
    /// Dispatch-unique job number, set for jobs run in an existing container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_job_id: Option<u64>,
    pub branch: String,
    /// Name the agent registers with on the platform.
    pub runner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    pub status: JobStatus,
    /// Failure detail for Failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Tail of the agent's combined stdout/stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl JobState {
    pub fn new(
        registration: Registration,
        run_id: u64,
        branch: impl Into<String>,
        runner_name: impl Into<String>,
        started_at_ms: u64,
    ) -> Self {
        Self {
            registration,
            run_id,
            workflow_job_id: None,
            branch: branch.into(),
            runner_name: runner_name.into(),
            container_id: None,
            clone_path: None,
            container_name: None,
            started_at_ms,
            finished_at_ms: None,
            status: JobStatus::Cloning,
            error: None,
            output: None,
        }
    }

    /// Move to `next` if it is later in the lifecycle.
    ///
    /// Returns false (and leaves the state untouched) for regressions and
    /// for any transition out of a terminal status.
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() || next <= self.status {
            return false;
        }
        self.status = next;
        true
    }

    /// Mark the job failed with a reason. The first recorded reason wins.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.advance(JobStatus::Failed) {
            self.error = Some(reason.into());
        }
    }

    /// Mark the job completed unless it already reached a terminal status.
    pub fn complete(&mut self) {
        self.advance(JobStatus::Completed);
    }

    /// Stamp the finish time once the job is terminal.
    pub fn finish(&mut self, now_ms: u64) {
        if self.status.is_terminal() && self.finished_at_ms.is_none() {
            self.finished_at_ms = Some(now_ms);
        }
    }

    /// Keep the tail of the agent output, at most [`MAX_OUTPUT_BYTES`].
    pub fn set_output(&mut self, output: &str) {
        self.output = Some(tail(output, MAX_OUTPUT_BYTES).to_string());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
