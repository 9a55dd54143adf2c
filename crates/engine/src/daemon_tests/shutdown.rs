// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn shutdown_waits_for_running_jobs_and_dispatches_nothing_new() {
    let ctx = setup(vec![widgets("")], policy(3));
    ctx.platform.set_queued("acme", "widgets", queued(&[1, 2]));
    let gate = ctx.gate_agent();
    let handle = ctx.start();

    ctx.wait_for("two active jobs", |s| s.active_count() == 2).await;
    ctx.daemon.request_shutdown();
    ctx.platform.set_queued("acme", "widgets", queued(&[1, 2, 3]));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!handle.is_finished());
    assert_eq!(ctx.platform.mints().len(), 2);

    gate.add_permits(2);
    within("daemon stop", handle).await.unwrap().unwrap();
    let status = ctx.daemon.status();
    assert!(!status.is_running);
    assert_eq!(status.total_completed, 2);
    assert_eq!(status.active_count(), 0);
    assert_eq!(ctx.platform.mints().len(), 2);
}

#[tokio::test]
async fn shutdown_interrupts_the_poll_sleep() {
    let ctx = setup(vec![widgets("")], Policy::new(Duration::from_secs(3600), 1));
    let handle = ctx.start();

    ctx.wait_for("first poll", |s| !s.last_poll_times.is_empty()).await;
    ctx.daemon.request_shutdown();
    within("daemon stop", handle).await.unwrap().unwrap();
    assert_eq!(ctx.platform.polls().len(), 1);
}

#[tokio::test]
async fn cancel_stops_running_jobs_with_cleanup() {
    let ctx = setup(vec![widgets("")], policy(2));
    ctx.platform.set_queued("acme", "widgets", queued(&[1]));
    let _gate = ctx.gate_agent();
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    ctx.wait_for("agent running", |s| s.active_jobs.values().any(|j| j.status == JobStatus::Running)).await;
    ctx.cancel.cancel();

    let DaemonEvent::JobCompleted(job) = next_event(&mut events, completed).await else { unreachable!() };
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("cancelled during agent"));
    within("daemon stop", handle).await.unwrap().unwrap();
    assert!(!ctx.runner.calls_matching("docker rm -f c0ffee").is_empty());
}
