// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn prerequisites_ready_when_both_tools_answer() {
    let ctx = setup();
    ctx.runner.on("docker version", CommandOutput::ok("27.3.1\n"));
    ctx.runner.on("devcontainer --version", CommandOutput::ok("0.71.0\n"));
    let prereqs = ctx.executor.check_prerequisites(&CancellationToken::new()).await;

    assert!(prereqs.is_ready());
    assert_eq!(prereqs.error, None);
}

#[tokio::test]
async fn unreachable_engine_is_reported() {
    let ctx = setup();
    ctx.runner.on("docker version", CommandOutput::failed(1, "Cannot connect to the Docker daemon"));
    let prereqs = ctx.executor.check_prerequisites(&CancellationToken::new()).await;

    assert!(!prereqs.engine_available);
    assert!(prereqs.devcontainer_available);
    let error = prereqs.error.unwrap();
    assert!(error.starts_with("docker is not available"));
    assert!(error.contains("Cannot connect"));
}

#[tokio::test]
async fn both_missing_tools_are_listed() {
    let ctx = setup();
    ctx.runner.on_spawn_error("docker version");
    ctx.runner.on_spawn_error("devcontainer --version");
    let prereqs = ctx.executor.check_prerequisites(&CancellationToken::new()).await;

    assert!(!prereqs.is_ready());
    let error = prereqs.error.unwrap();
    assert!(error.contains("docker is not available"));
    assert!(error.contains("devcontainer is not available"));
}

#[tokio::test]
async fn discovery_lists_labelled_containers() {
    let ctx = setup();
    ctx.runner.on(
        "docker ps",
        CommandOutput::ok(
            "3f2a9c\tgpu-box\tacme\twidgets\t2026-01-01 00:00:00 +0000 UTC\n\
             77aa00\tarm-box\tacme\tgadgets\t2026-01-02 00:00:00 +0000 UTC\n\n",
        ),
    );
    let entries = ctx.executor.discover_named_containers(&CancellationToken::new()).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "gpu-box");
    assert_eq!(entries[1].container_id, "77aa00");
    assert_eq!(entries[1].repository, "gadgets");
    let args = ctx.args_of("docker ps");
    assert!(args.windows(2).any(|w| w[0] == "--filter" && w[1] == "label=jitr.name"));
}

#[tokio::test]
async fn discovery_failure_is_an_error() {
    let ctx = setup();
    ctx.runner.on("docker ps", CommandOutput::failed(1, "permission denied"));
    let err = ctx.executor.discover_named_containers(&CancellationToken::new()).await.unwrap_err();

    match err {
        ExecutorError::CommandFailed { exit_code, detail, .. } => {
            assert_eq!(exit_code, 1);
            assert_eq!(detail, "permission denied");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[yare::parameterized(
    running = { CommandOutput::ok("true\n"), true },
    stopped = { CommandOutput::ok("false\n"), false },
    missing = { CommandOutput::failed(1, "Error: No such object: b0b0"), false },
)]
#[test_macro(tokio::test)]
async fn container_running_reads_engine_state(reply: CommandOutput, expected: bool) {
    let ctx = setup();
    ctx.runner.on("docker inspect", reply);
    assert_eq!(ctx.executor.container_running("b0b0", &CancellationToken::new()).await, expected);
}

#[tokio::test]
async fn inspect_spawn_error_counts_as_not_running() {
    let ctx = setup();
    ctx.runner.on_spawn_error("docker inspect");
    assert!(!ctx.executor.container_running("b0b0", &CancellationToken::new()).await);
}
