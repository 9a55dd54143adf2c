// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers shared with other crates via the `test-support` feature.

use crate::{JobState, Registration};

/// Registration for `acme/widgets` with the given labels.
pub fn registration(labels: &str) -> Registration {
    Registration::new("acme", "widgets").labels(labels)
}

/// Fresh job for `acme/widgets` on `main`.
pub fn job_state(run_id: u64) -> JobState {
    JobState::new(registration(""), run_id, "main", format!("jitr-{}-1000000", run_id), 1_000_000)
}

pub mod strategies {
    use crate::JobStatus;
    use proptest::prelude::*;

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Cloning),
            Just(JobStatus::Building),
            Just(JobStatus::Running),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed),
        ]
    }
}
