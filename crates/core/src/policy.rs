// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon scheduling policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often to poll and how many jobs may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(with = "secs", rename = "poll_interval_secs", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Policy {
    pub fn new(poll_interval: Duration, max_concurrent_jobs: usize) -> Self {
        Self { poll_interval, max_concurrent_jobs }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent_jobs() -> usize {
    2
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
