// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn queued_run_is_dispatched_and_completed() {
    let ctx = setup(vec![widgets("gpu")], policy(2));
    ctx.platform.set_queued("acme", "widgets", queued(&[42]));
    let gate = ctx.gate_agent();
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    let started = next_event(&mut events, |e| matches!(e, DaemonEvent::JobStarted(_))).await;
    let DaemonEvent::JobStarted(job) = started else { unreachable!() };
    assert_eq!(job.run_id, 42);
    assert_eq!(job.branch, "main");
    assert!(job.runner_name.starts_with("jitr-42-"));

    ctx.wait_for("one active job", |s| s.active_count() == 1).await;
    let mints = ctx.platform.mints();
    assert_eq!(mints.len(), 1);
    assert_eq!(mints[0].labels, vec!["self-hosted", "gpu"]);
    assert_eq!(mints[0].name, job.runner_name);
    assert!(ctx.daemon.status().last_poll_times.contains_key("acme/widgets"));

    ctx.platform.set_queued("acme", "widgets", vec![]);
    gate.add_permits(1);
    let DaemonEvent::JobCompleted(done) = next_event(&mut events, completed).await else { unreachable!() };
    assert_eq!(done.run_id, 42);
    assert_eq!(done.status, JobStatus::Completed);

    let status = ctx.daemon.status();
    assert_eq!(status.active_count(), 0);
    assert_eq!(status.total_completed, 1);
    assert_eq!(status.recent_jobs.len(), 1);
    ctx.stop(handle).await;
}

#[tokio::test]
async fn active_jobs_never_exceed_the_limit() {
    let ctx = setup(vec![widgets("")], policy(2));
    ctx.platform.set_queued("acme", "widgets", queued(&[1, 2, 3]));
    let gate = ctx.gate_agent();
    let handle = ctx.start();

    ctx.wait_for("two active jobs", |s| s.active_count() == 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctx.daemon.status().active_count(), 2);
    assert_eq!(ctx.platform.mints().len(), 2);
    assert!(ctx.platform.mints().iter().all(|m| !m.name.starts_with("jitr-3-")));

    // one of the first two finishes; only run 3 is still queued
    ctx.platform.set_queued("acme", "widgets", queued(&[3]));
    gate.add_permits(1);
    ctx.wait_for("run 3 dispatched", |s| {
        assert!(s.active_count() <= 2);
        s.active_jobs.values().any(|j| j.run_id == 3)
    })
    .await;

    ctx.platform.set_queued("acme", "widgets", vec![]);
    gate.add_permits(2);
    ctx.wait_for("all done", |s| s.total_completed == 3).await;
    ctx.stop(handle).await;
}

#[tokio::test]
async fn in_flight_run_is_not_dispatched_twice() {
    let ctx = setup(vec![widgets("")], policy(5));
    ctx.platform.set_queued("acme", "widgets", queued(&[42]));
    let gate = ctx.gate_agent();
    let handle = ctx.start();

    ctx.wait_for("one active job", |s| s.active_count() == 1).await;
    let polls_before = ctx.platform.polls().len();
    within("several polls", async {
        while ctx.platform.polls().len() < polls_before + 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(ctx.platform.mints().len(), 1);
    assert_eq!(ctx.daemon.status().active_count(), 1);

    // still queued after completion: dispatched again on a later cycle
    gate.add_permits(1);
    within("redispatch", async {
        while ctx.platform.mints().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    ctx.platform.set_queued("acme", "widgets", vec![]);
    gate.add_permits(10);
    ctx.wait_for("idle", |s| s.active_count() == 0 && s.total_completed >= 2).await;
    ctx.stop(handle).await;
}

#[tokio::test]
async fn progress_updates_the_active_entry() {
    let ctx = setup(vec![widgets("")], policy(1));
    ctx.platform.set_queued("acme", "widgets", queued(&[42]));
    let gate = ctx.gate_agent();
    let handle = ctx.start();

    ctx.wait_for("agent running", |s| {
        s.active_jobs.values().any(|j| j.status == JobStatus::Running && j.container_id.is_some())
    })
    .await;

    ctx.platform.set_queued("acme", "widgets", vec![]);
    gate.add_permits(1);
    ctx.wait_for("done", |s| s.total_completed == 1).await;
    ctx.stop(handle).await;
}

#[tokio::test]
async fn disabled_registrations_are_not_polled() {
    let ctx = setup(vec![widgets(""), Registration::new("acme", "gadgets").enabled(false)], policy(1));
    let handle = ctx.start();

    ctx.wait_for("first poll", |s| s.last_poll_times.contains_key("acme/widgets")).await;
    ctx.stop(handle).await;
    assert!(ctx.platform.polls().iter().all(|p| p == "acme/widgets"));
}

#[tokio::test]
async fn status_changes_are_published() {
    let ctx = setup(vec![widgets("")], policy(1));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    next_event(&mut events, |e| *e == DaemonEvent::StatusChanged("running".to_string())).await;
    ctx.wait_for("running", |s| s.is_running && s.started_at_ms.is_some()).await;
    ctx.stop(handle).await;
    next_event(&mut events, |e| *e == DaemonEvent::StatusChanged("stopped".to_string())).await;
    assert!(!ctx.daemon.status().is_running);
}
