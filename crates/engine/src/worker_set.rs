// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded set of in-flight job tasks.

use std::future::Future;
use tokio::task::{JoinError, JoinSet};

/// Owns every spawned job task so shutdown can wait for all of them.
pub struct WorkerSet<T> {
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> Default for WorkerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> WorkerSet<T> {
    pub fn new() -> Self {
        Self { tasks: JoinSet::new() }
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Tasks spawned and not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Collect the results of tasks that already finished, without waiting.
    pub fn reap(&mut self) -> Vec<T> {
        let mut done = Vec::new();
        while let Some(result) = self.tasks.try_join_next() {
            if let Some(value) = joined(result) {
                done.push(value);
            }
        }
        done
    }

    /// Wait for every remaining task.
    pub async fn drain(&mut self) -> Vec<T> {
        let mut done = Vec::new();
        while let Some(result) = self.tasks.join_next().await {
            if let Some(value) = joined(result) {
                done.push(value);
            }
        }
        done
    }
}

fn joined<T>(result: Result<T, JoinError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_cancelled() => {
            tracing::warn!("worker task was aborted");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "worker task panicked");
            None
        }
    }
}

#[cfg(test)]
#[path = "worker_set_tests.rs"]
mod tests;
