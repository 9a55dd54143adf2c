// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn target() -> ExistingContainer {
    ExistingContainer::new(7, "b0b0", "gpu-box")
}

async fn run_existing(ctx: &TestContext, target: ExistingContainer) -> JobState {
    ctx.executor
        .execute_job_in_existing_container(request(42), target, credential(), &|_| {}, &CancellationToken::new())
        .await
}

/// Agent directory used by the recorded install call.
fn install_dir(ctx: &TestContext) -> String {
    let script = ctx.args_of(INSTALL_AGENT).last().cloned().unwrap();
    let line = script.lines().find(|l| l.starts_with("mkdir -p ")).unwrap();
    line.trim_start_matches("mkdir -p ").to_string()
}

#[tokio::test]
async fn runs_in_a_job_scoped_directory() {
    let ctx = setup();
    let job = run_existing(&ctx, target()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.workflow_job_id, Some(7));
    assert_eq!(job.container_id.as_deref(), Some("b0b0"));
    assert_eq!(job.container_name.as_deref(), Some("gpu-box"));

    let dir = install_dir(&ctx);
    let suffix = dir.strip_prefix("/tmp/jitr/jobs/42-7-").unwrap();
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

    let run_script = ctx.args_of(RUN_AGENT).last().cloned().unwrap();
    assert!(run_script.starts_with(&format!("cd {dir}\n")));
    assert!(ctx.position(&format!("rm -rf {dir}")).is_some());
}

#[tokio::test]
async fn never_clones_provisions_or_removes_the_container() {
    let ctx = setup();
    run_existing(&ctx, target()).await;

    assert!(ctx.runner.calls_matching("git clone").is_empty());
    assert!(ctx.runner.calls_matching("devcontainer up").is_empty());
    assert!(ctx.runner.calls_matching("docker rm").is_empty());
    assert!(ctx.args_of(INSTALL_AGENT).windows(2).any(|w| w[0] == "--container-id" && w[1] == "b0b0"));
}

#[tokio::test]
async fn sequential_jobs_get_distinct_directories() {
    let ctx = setup();
    run_existing(&ctx, target()).await;
    run_existing(&ctx, target()).await;

    let dirs: Vec<String> = ctx
        .runner
        .calls_matching(INSTALL_AGENT)
        .iter()
        .filter_map(|c| c.args.last().cloned())
        .collect();
    assert_eq!(dirs.len(), 2);
    assert_ne!(dirs[0], dirs[1]);
}

#[tokio::test]
async fn failure_removes_only_the_job_directory() {
    let ctx = setup();
    ctx.runner.on(RUN_AGENT, CommandOutput::failed(1, "boom"));
    let clone_dir = ctx.work_root.join("gpu-box-clone");
    std::fs::create_dir_all(&clone_dir).unwrap();

    let job = run_existing(&ctx, target().clone_path(clone_dir.clone())).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("boom"));
    assert_eq!(job.clone_path.as_deref(), Some(clone_dir.as_path()));
    assert!(clone_dir.exists());
    assert!(ctx.position("rm -rf /tmp/jitr/jobs/42-7-").is_some());
    assert!(ctx.runner.calls_matching("docker rm").is_empty());
}

#[tokio::test]
async fn progress_starts_at_building() {
    let ctx = setup();
    let progress = Progress::default();
    let callback = progress.callback();
    ctx.executor
        .execute_job_in_existing_container(request(42), target(), credential(), &callback, &CancellationToken::new())
        .await;

    assert_eq!(progress.statuses(), vec![JobStatus::Building, JobStatus::Running, JobStatus::Completed]);
}

#[tokio::test]
async fn cancelled_agent_is_stopped_before_its_directory_is_removed() {
    let ctx = setup();
    ctx.runner.on_gated(RUN_AGENT, CommandOutput::ok(AGENT_OK), Arc::new(tokio::sync::Semaphore::new(0)));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let job = ctx
        .executor
        .execute_job_in_existing_container(request(42), target(), credential(), &|_| {}, &cancel)
        .await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("cancelled"));
    let dir = install_dir(&ctx);
    let stop = ctx.position("pkill -f").unwrap();
    let remove = ctx.position(&format!("rm -rf {dir}")).unwrap();
    assert!(stop < remove);

    let script = ctx.runner.calls_matching("pkill -f")[0].args.last().cloned().unwrap();
    assert_eq!(script, format!("pkill -f '[/]{}/' || true", &dir[1..]));
    assert!(!script.contains(&dir));
}
