// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use jitr_adapters::{CommandSpec, ProcessError};

#[tokio::test]
async fn poll_failure_does_not_stop_other_registrations() {
    let gadgets = Registration::new("acme", "gadgets");
    let ctx = setup(vec![widgets(""), gadgets], policy(1));
    ctx.platform.fail_polls("acme", "widgets", true);
    ctx.platform.set_queued("acme", "gadgets", queued(&[9]));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    let DaemonEvent::StatusChanged(message) =
        next_event(&mut events, |e| matches!(e, DaemonEvent::StatusChanged(m) if m.starts_with("poll failed"))).await
    else {
        unreachable!()
    };
    assert!(message.contains("acme/widgets"));

    ctx.wait_for("gadgets job", |s| s.total_completed >= 1).await;
    ctx.platform.set_queued("acme", "gadgets", vec![]);
    let status = ctx.daemon.status();
    assert!(status.is_running);
    assert!(status.last_poll_times.contains_key("acme/gadgets"));
    assert!(!status.last_poll_times.contains_key("acme/widgets"));

    ctx.platform.fail_polls("acme", "widgets", false);
    ctx.wait_for("widgets polled", |s| s.last_poll_times.contains_key("acme/widgets")).await;
    ctx.stop(handle).await;
}

#[tokio::test]
async fn credential_failure_is_a_failed_job() {
    let ctx = setup(vec![widgets("")], policy(1));
    ctx.platform.fail_mints("acme", "widgets");
    ctx.platform.set_queued("acme", "widgets", queued(&[5]));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    let DaemonEvent::JobCompleted(job) = next_event(&mut events, completed).await else { unreachable!() };
    assert_eq!(job.run_id, 5);
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().starts_with("failed to mint runner credential"));
    assert!(job.finished_at_ms.is_some());

    ctx.platform.set_queued("acme", "widgets", vec![]);
    ctx.stop(handle).await;
    let status = ctx.daemon.status();
    assert!(status.total_failed >= 1);
    assert_eq!(status.active_count(), 0);
    assert!(ctx.runner.calls_matching("git clone").is_empty());
}

#[tokio::test]
async fn execution_failure_is_counted() {
    let ctx = setup(vec![widgets("")], policy(1));
    ctx.runner.on("git clone", CommandOutput::failed(128, "fatal: repository not found"));
    ctx.platform.set_queued("acme", "widgets", queued(&[5]));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    let DaemonEvent::JobCompleted(job) = next_event(&mut events, completed).await else { unreachable!() };
    ctx.platform.set_queued("acme", "widgets", vec![]);
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("repository not found"));
    ctx.stop(handle).await;

    let status = ctx.daemon.status();
    assert!(status.total_failed >= 1);
    assert_eq!(status.total_completed, 0);
    assert_eq!(status.recent_jobs.last().unwrap().status, JobStatus::Failed);
}

/// Runner whose every command panics.
#[derive(Clone)]
struct PanickingRunner;

#[async_trait]
impl CommandRunner for PanickingRunner {
    async fn run(&self, _spec: &CommandSpec, _cancel: &CancellationToken) -> Result<CommandOutput, ProcessError> {
        panic!("runner exploded")
    }
}

#[tokio::test]
async fn panicking_job_becomes_failed_and_daemon_keeps_going() {
    let tmp = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    platform.set_queued("acme", "widgets", queued(&[13]));
    let clock = FakeClock::new();
    let executor = JobExecutor::new(
        PanickingRunner,
        clock.clone(),
        ExecutorConfig::default().work_root(tmp.path().join("work")),
    );
    let daemon = Arc::new(Daemon::new(
        platform.clone(),
        executor,
        StaticConfig::new(vec![widgets("")], policy(1)),
        clock,
    ));
    let mut events = daemon.subscribe();
    let cancel = CancellationToken::new();
    let handle = {
        let daemon = Arc::clone(&daemon);
        let cancel = cancel.clone();
        tokio::spawn(async move { daemon.run(&cancel).await })
    };

    let DaemonEvent::JobCompleted(job) = next_event(&mut events, completed).await else { unreachable!() };
    assert_eq!(job.run_id, 13);
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("job task panicked: runner exploded"));

    platform.set_queued("acme", "widgets", vec![]);
    assert!(daemon.status().is_running);
    daemon.request_shutdown();
    within("daemon stop", handle).await.unwrap().unwrap();
    assert_eq!(daemon.status().active_count(), 0);
}
