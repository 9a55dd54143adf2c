// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Values exchanged with the CI platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Single-use just-in-time runner configuration.
///
/// Deliberately neither `Clone` nor `Serialize`: the executor takes it by
/// value, so one credential can back at most one job execution.
pub struct EphemeralCredential {
    pub runner_id: u64,
    encoded_config: String,
}

impl EphemeralCredential {
    pub fn new(runner_id: u64, encoded_config: impl Into<String>) -> Self {
        Self { runner_id, encoded_config: encoded_config.into() }
    }

    pub fn encoded_config(&self) -> &str {
        &self.encoded_config
    }

    /// Consume the credential, yielding the encoded configuration.
    pub fn into_encoded_config(self) -> String {
        self.encoded_config
    }
}

impl fmt::Debug for EphemeralCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralCredential")
            .field("runner_id", &self.runner_id)
            .field("encoded_config", &"***")
            .finish()
    }
}

/// A queued workflow run awaiting a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedWork {
    pub id: u64,
    pub head_branch: String,
    pub created_at_ms: u64,
}

impl QueuedWork {
    pub fn new(id: u64, head_branch: impl Into<String>, created_at_ms: u64) -> Self {
        Self { id, head_branch: head_branch.into(), created_at_ms }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
