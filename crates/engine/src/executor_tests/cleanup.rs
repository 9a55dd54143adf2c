// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jitr_core::test_support::job_state;

fn provisioned(ctx: &TestContext, container_name: Option<&str>) -> JobState {
    let clone_dir = ctx.work_root.join("clone");
    std::fs::create_dir_all(&clone_dir).unwrap();
    let mut job = job_state(42);
    job.container_id = Some("c0ffee".to_string());
    job.clone_path = Some(clone_dir);
    job.container_name = container_name.map(str::to_string);
    job
}

#[yare::parameterized(
    anonymous = { None, true },
    blank     = { Some(""), true },
    named     = { Some("gpu-box"), false },
)]
#[test_macro(tokio::test)]
async fn container_is_removed_unless_named(name: Option<&str>, removed: bool) {
    let ctx = setup();
    let job = provisioned(&ctx, name);
    ctx.executor.cleanup(&job).await;

    assert_eq!(ctx.position("docker rm -f c0ffee").is_some(), removed);
    assert!(!job.clone_path.unwrap().exists());
}

#[tokio::test]
async fn nothing_provisioned_is_a_no_op() {
    let ctx = setup();
    ctx.executor.cleanup(&job_state(42)).await;
    assert!(ctx.runner.calls().is_empty());
}

#[tokio::test]
async fn cleanup_failure_does_not_change_the_job() {
    let ctx = setup();
    ctx.runner.on("docker rm", CommandOutput::failed(1, "Error: No such container: c0ffee"));
    let job = ctx.run(request(42)).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.error, None);
}

#[tokio::test]
async fn engine_path_is_used_for_removal() {
    let ctx = setup_with(|config| config.engine("podman"));
    ctx.run(request(42)).await;

    assert!(ctx.position("podman rm -f c0ffee").is_some());
    assert!(ctx.args_of("devcontainer up").windows(2).any(|w| w[0] == "--docker-path" && w[1] == "podman"));
}
