// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jitr_core::test_support::job_state;

#[test]
fn admit_enforces_limit_and_dedupes_runs() {
    let mut state = SharedState::default();
    assert_eq!(state.admit(&job_state(1), 2), Admission::Admitted);
    assert_eq!(state.admit(&job_state(1), 2), Admission::InFlight);
    assert_eq!(state.admit(&job_state(2), 2), Admission::Admitted);
    assert_eq!(state.admit(&job_state(3), 2), Admission::AtCapacity);
    assert_eq!(state.snapshot().active_count(), 2);
}

#[test]
fn finish_frees_the_slot_and_counts() {
    let mut state = SharedState::default();
    let mut job = job_state(1);
    state.admit(&job, 1);
    job.complete();
    state.finish(job);

    let status = state.snapshot();
    assert_eq!(status.active_count(), 0);
    assert_eq!(status.total_completed, 1);
    assert_eq!(state.admit(&job_state(1), 1), Admission::Admitted);
}

#[test]
fn unfinished_job_counts_as_failed() {
    let mut state = SharedState::default();
    let job = job_state(1);
    state.admit(&job, 1);
    state.finish(job);

    let status = state.snapshot();
    assert_eq!(status.total_failed, 1);
    assert_eq!(status.recent_jobs[0].status, JobStatus::Failed);
}

#[test]
fn update_ignores_retired_jobs() {
    let mut state = SharedState::default();
    let mut job = job_state(1);
    job.fail("boom");
    state.update(&job);
    assert_eq!(state.snapshot().active_count(), 0);
}

#[test]
fn recent_jobs_are_bounded() {
    let mut state = SharedState::default();
    for run_id in 0..30 {
        let mut job = job_state(run_id);
        job.complete();
        state.finish(job);
    }
    let status = state.snapshot();
    assert_eq!(status.recent_jobs.len(), RECENT_JOBS);
    assert_eq!(status.recent_jobs.last().unwrap().run_id, 29);
    assert_eq!(status.total_completed, 30);
}

#[test]
fn job_ids_are_unique() {
    let mut state = SharedState::default();
    assert_eq!(state.next_job_id(), 1);
    assert_eq!(state.next_job_id(), 2);
}
