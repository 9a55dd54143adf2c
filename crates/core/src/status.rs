// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time daemon health snapshot.

use crate::job::JobState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only copy of daemon state; never a live view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub is_running: bool,
    pub started_at_ms: Option<u64>,
    /// Running jobs keyed by runner name.
    pub active_jobs: BTreeMap<String, JobState>,
    /// Last successful poll per `owner/repository`.
    pub last_poll_times: BTreeMap<String, u64>,
    pub total_completed: u64,
    pub total_failed: u64,
    /// Most recently finished jobs, newest last.
    pub recent_jobs: Vec<JobState>,
}

impl DaemonStatus {
    pub fn active_count(&self) -> usize {
        self.active_jobs.len()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} active, {} completed, {} failed",
            self.active_jobs.len(),
            self.total_completed,
            self.total_failed
        )
    }
}
