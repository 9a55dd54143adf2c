// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn gpu_box() -> Registration {
    widgets("gpu").container_name("gpu-box")
}

const LISTING: &str = "b0b0\tgpu-box\tacme\twidgets\t2026-01-01 00:00:00 +0000 UTC\n";

#[tokio::test]
async fn discovered_container_is_reused() {
    let ctx = setup(vec![gpu_box()], policy(2));
    ctx.runner.on("docker ps", CommandOutput::ok(LISTING));
    ctx.runner.on("docker inspect", CommandOutput::ok("true\n"));
    ctx.platform.set_queued("acme", "widgets", queued(&[42]));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    let DaemonEvent::JobCompleted(job) = next_event(&mut events, completed).await else { unreachable!() };
    ctx.platform.set_queued("acme", "widgets", vec![]);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.container_id.as_deref(), Some("b0b0"));
    assert_eq!(job.container_name.as_deref(), Some("gpu-box"));
    assert!(job.workflow_job_id.is_some());
    ctx.stop(handle).await;

    assert!(ctx.runner.calls_matching("git clone").is_empty());
    assert!(ctx.runner.calls_matching("devcontainer up").is_empty());
    assert!(ctx.runner.calls_matching("docker rm").is_empty());
    assert!(!ctx.runner.calls_matching("rm -rf /tmp/jitr/jobs/42-").is_empty());
    let entry = ctx.daemon.pool().try_get("gpu-box").unwrap();
    assert_eq!(entry.container_id, "b0b0");
    assert!(!entry.in_use);
}

#[tokio::test]
async fn dead_container_is_replaced() {
    let ctx = setup(vec![gpu_box()], policy(2));
    ctx.runner.on("docker ps", CommandOutput::ok(LISTING));
    ctx.runner.on("docker inspect", CommandOutput::ok("false\n"));
    ctx.platform.set_queued("acme", "widgets", queued(&[42]));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    let DaemonEvent::JobCompleted(job) = next_event(&mut events, completed).await else { unreachable!() };
    ctx.platform.set_queued("acme", "widgets", vec![]);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.container_id.as_deref(), Some("c0ffee"));
    ctx.stop(handle).await;

    let up = &ctx.runner.calls_matching("devcontainer up")[0];
    assert!(up.args.contains(&"jitr.name=gpu-box".to_string()));
    assert!(ctx.runner.calls_matching("docker rm").is_empty());
    assert_eq!(ctx.daemon.pool().try_get("gpu-box").unwrap().container_id, "c0ffee");
}

#[tokio::test]
async fn jobs_for_one_name_run_one_at_a_time() {
    let ctx = setup(vec![gpu_box()], policy(2));
    ctx.runner.on("docker inspect", CommandOutput::ok("true\n"));
    ctx.platform.set_queued("acme", "widgets", queued(&[1, 2]));
    let gate = ctx.gate_agent();
    let handle = ctx.start();

    ctx.wait_for("both admitted", |s| s.active_count() == 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctx.runner.calls_matching(RUN_AGENT).len(), 1);

    ctx.platform.set_queued("acme", "widgets", vec![]);
    gate.add_permits(1);
    within("second agent", async {
        while ctx.runner.calls_matching(RUN_AGENT).len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    // the second job reuses the container the first one provisioned
    assert_eq!(ctx.runner.calls_matching("devcontainer up").len(), 1);
    assert!(!ctx.runner.calls_matching("mkdir -p /tmp/jitr/jobs/").is_empty());

    gate.add_permits(1);
    ctx.wait_for("both done", |s| s.total_completed == 2).await;
    ctx.stop(handle).await;
}

#[tokio::test]
async fn discovery_failure_is_reported_and_not_fatal() {
    let ctx = setup(vec![gpu_box()], policy(1));
    ctx.runner.on("docker ps", CommandOutput::failed(1, "Cannot connect to the Docker daemon"));
    let mut events = ctx.daemon.subscribe();
    let handle = ctx.start();

    next_event(&mut events, |e| matches!(e, DaemonEvent::StatusChanged(m) if m.contains("discovery failed"))).await;
    ctx.wait_for("first poll", |s| !s.last_poll_times.is_empty()).await;
    ctx.stop(handle).await;
    assert!(ctx.daemon.pool().get_all().is_empty());
}

#[tokio::test]
async fn anonymous_registrations_skip_discovery() {
    let ctx = setup(vec![widgets("")], policy(1));
    let handle = ctx.start();
    ctx.wait_for("first poll", |s| !s.last_poll_times.is_empty()).await;
    ctx.stop(handle).await;
    assert!(ctx.runner.calls_matching("docker ps").is_empty());
}
