// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn exited(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput { exit_code: code, stdout: stdout.into(), stderr: stderr.into() }
}

#[yare::parameterized(
    listening = { "√ Connected to GitHub\nListening for Jobs\n" },
    picked_up = { "Running job: build (ubuntu)\n" },
    finished  = { "Job build completed with result: Succeeded\n" },
)]
fn attach_marker_means_completed(stdout: &str) {
    assert_eq!(classify_agent(&exited(0, stdout, "")), AgentOutcome::Completed);
}

#[test]
fn silent_success_is_failure() {
    let outcome = classify_agent(&exited(0, "  \n", ""));
    assert_eq!(outcome, AgentOutcome::Failed("agent produced no output".to_string()));
}

#[test]
fn output_without_marker_is_failure() {
    let outcome = classify_agent(&exited(0, "Runner update in progress\n", ""));
    match outcome {
        AgentOutcome::Failed(reason) => assert!(reason.contains("never attached")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn non_zero_exit_carries_stderr() {
    let outcome = classify_agent(&exited(1, "Listening for Jobs", "registration expired"));
    assert_eq!(
        outcome,
        AgentOutcome::Failed("agent exited with code 1: registration expired".to_string())
    );
}

#[test]
fn non_zero_exit_falls_back_to_stdout() {
    let outcome = classify_agent(&exited(2, "bad config", ""));
    assert_eq!(outcome, AgentOutcome::Failed("agent exited with code 2: bad config".to_string()));
}

#[yare::parameterized(
    only_json  = { r#"{"outcome":"success","containerId":"abc123","remoteUser":"vscode"}"#, "abc123" },
    after_logs = { "[1 ms] @devcontainers/cli 0.71.0\nStart: Run: docker build\n{\"outcome\":\"success\",\"containerId\":\"def456\"}\n", "def456" },
    last_wins  = { "{\"containerId\":\"old\"}\n{\"outcome\":\"success\",\"containerId\":\"new\"}", "new" },
    trailing   = { "{\"outcome\":\"success\",\"containerId\":\"  ghi789 \"}\n\n", "ghi789" },
)]
fn up_output_yields_container_id(stdout: &str, expected: &str) {
    assert_eq!(parse_up_output(stdout).into_container_id().unwrap(), expected);
}

#[yare::parameterized(
    empty      = { "" },
    no_json    = { "Start: Run: docker build\nDone" },
    no_id      = { r#"{"outcome":"success"}"# },
    blank_id   = { r#"{"outcome":"success","containerId":""}"# },
    error      = { r#"{"outcome":"error","message":"Command failed: docker build","description":"An error occurred"}"# },
)]
fn up_output_without_id_is_error(stdout: &str) {
    assert!(parse_up_output(stdout).into_container_id().is_err());
}

#[test]
fn up_error_reports_message() {
    let err = parse_up_output(r#"{"outcome":"error","message":"no devcontainer.json"}"#)
        .into_container_id()
        .unwrap_err();
    assert_eq!(err, "devcontainer up failed: no devcontainer.json");
}

#[test]
fn failed_up_still_reports_created_container() {
    let result = parse_up_output(r#"{"outcome":"error","containerId":"dead01","message":"postCreate failed"}"#);
    assert_eq!(result.container_id.as_deref(), Some("dead01"));
    assert!(result.into_container_id().is_err());
}

#[test]
fn listing_line_parses_labels_and_creation_time() {
    let line = "3f2a9c\tgpu-box\tacme\twidgets\t2026-01-01 00:00:00 +0000 UTC";
    let entry = parse_listing_line(line, 2_000_000_000_000).unwrap();
    assert_eq!(entry.container_id, "3f2a9c");
    assert_eq!(entry.name, "gpu-box");
    assert_eq!(entry.owner, "acme");
    assert_eq!(entry.repository, "widgets");
    assert_eq!(entry.created_at_ms, 1_767_225_600_000);
    assert_eq!(entry.last_used_at_ms, 2_000_000_000_000);
    assert!(!entry.in_use);
}

#[test]
fn listing_line_with_odd_timestamp_uses_now() {
    let entry = parse_listing_line("3f2a9c\tgpu-box\tacme\twidgets\tyesterday", 5).unwrap();
    assert_eq!(entry.created_at_ms, 5);
}

#[yare::parameterized(
    blank       = { "" },
    no_name     = { "3f2a9c\t\tacme\twidgets\t" },
    only_id     = { "3f2a9c" },
)]
fn malformed_listing_lines_are_skipped(line: &str) {
    assert!(parse_listing_line(line, 0).is_none());
}
