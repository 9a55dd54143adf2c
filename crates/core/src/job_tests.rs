// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::*;
use proptest::prelude::*;

fn job() -> JobState {
    JobState::new(Registration::new("acme", "widgets"), 42, "main", "jitr-42-1000", 1_000)
}

#[test]
fn new_job_starts_cloning() {
    let job = job();
    assert_eq!(job.status, JobStatus::Cloning);
    assert!(!job.is_terminal());
}

#[test]
fn advance_moves_forward() {
    let mut job = job();
    assert!(job.advance(JobStatus::Building));
    assert!(job.advance(JobStatus::Running));
    assert_eq!(job.status, JobStatus::Running);
}

#[test]
fn advance_rejects_regression() {
    let mut job = job();
    job.advance(JobStatus::Running);
    assert!(!job.advance(JobStatus::Cloning));
    assert_eq!(job.status, JobStatus::Running);
}

#[test]
fn terminal_status_is_final() {
    let mut job = job();
    job.fail("clone failed");
    job.complete();
    assert_eq!(job.status, JobStatus::Failed);

    let mut job2 = self::job();
    job2.complete();
    job2.fail("late failure");
    assert_eq!(job2.status, JobStatus::Completed);
    assert_eq!(job2.error, None);
}

#[test]
fn first_failure_reason_wins() {
    let mut job = job();
    job.fail("first");
    job.fail("second");
    assert_eq!(job.error.as_deref(), Some("first"));
}

#[test]
fn finish_stamps_only_terminal_jobs() {
    let mut job = job();
    job.finish(2_000);
    assert_eq!(job.finished_at_ms, None);
    job.complete();
    job.finish(3_000);
    job.finish(4_000);
    assert_eq!(job.finished_at_ms, Some(3_000));
}

#[test]
fn output_keeps_tail() {
    let mut job = job();
    let long = "x".repeat(MAX_OUTPUT_BYTES) + "END";
    job.set_output(&long);
    let kept = job.output.unwrap();
    assert_eq!(kept.len(), MAX_OUTPUT_BYTES);
    assert!(kept.ends_with("END"));
}

#[test]
fn tail_respects_char_boundaries() {
    assert_eq!(tail("héllo", 4), "llo");
}

#[test]
fn status_display() {
    assert_eq!(JobStatus::Building.to_string(), "building");
    assert_eq!(serde_json::to_string(&JobStatus::Completed).unwrap(), "\"completed\"");
}

proptest! {
    #[test]
    fn status_never_regresses(steps in proptest::collection::vec(arb_job_status(), 0..20)) {
        let mut job = job();
        let mut prev = job.status;
        for step in steps {
            job.advance(step);
            prop_assert!(job.status >= prev);
            if prev.is_terminal() {
                prop_assert_eq!(job.status, prev);
            }
            prev = job.status;
        }
    }
}
