// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const QUEUED_RUNS: &str = r#"{
  "total_count": 3,
  "workflow_runs": [
    {"id": 30, "head_branch": "feature", "created_at": "2026-01-02T00:00:00Z", "status": "queued"},
    {"id": 42, "head_branch": "main", "created_at": "2026-01-01T00:00:00Z", "status": "queued"},
    {"id": 50, "head_branch": null, "created_at": "2026-01-01T00:00:00Z", "status": "queued"}
  ]
}"#;

#[test]
fn queued_runs_decode_oldest_first_and_skip_branchless() {
    let runs: WorkflowRuns = serde_json::from_str(QUEUED_RUNS).unwrap();
    let work = runs.into_queued_work();
    assert_eq!(work.len(), 2);
    assert_eq!(work[0], QueuedWork::new(42, "main", 1_767_225_600_000));
    assert_eq!(work[1].id, 30);
    assert_eq!(work[1].head_branch, "feature");
}

#[test]
fn empty_run_list_decodes() {
    let runs: WorkflowRuns = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
    assert!(runs.into_queued_work().is_empty());
}

#[test]
fn jit_config_response_decodes() {
    let body = r#"{"runner": {"id": 23, "name": "jitr-42-1", "os": "unknown"}, "encoded_jit_config": "eyJ0"}"#;
    let resp: JitConfigResponse = serde_json::from_str(body).unwrap();
    assert_eq!(resp.runner.id, 23);
    assert_eq!(resp.encoded_jit_config, "eyJ0");
}

#[test]
fn jit_config_request_serializes_labels() {
    let labels = vec!["self-hosted".to_string(), "gpu".to_string()];
    let req = JitConfigRequest {
        name: "jitr-42-1",
        runner_group_id: 1,
        labels: &labels,
        work_folder: "_work",
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["labels"], serde_json::json!(["self-hosted", "gpu"]));
    assert_eq!(json["runner_group_id"], 1);
}

#[yare::parameterized(
    unauthorized = { 401, true },
    forbidden    = { 403, true },
    not_found    = { 404, true },
    conflict     = { 409, false },
    server_error = { 502, false },
)]
fn status_classification(code: u16, denied: bool) {
    let status = StatusCode::from_u16(code).unwrap();
    let err = classify_status("/repos/acme/widgets", status, r#"{"message": "Bad credentials"}"#);
    assert_eq!(err.is_access_denied(), denied);
}

#[test]
fn status_error_carries_github_message() {
    let err = classify_status(
        "/repos/acme/widgets/actions/runners/generate-jitconfig",
        StatusCode::CONFLICT,
        r#"{"message": "Already exists - A runner with the name already exists."}"#,
    );
    match err {
        PlatformError::Status { status, body, .. } => {
            assert_eq!(status, 409);
            assert!(body.starts_with("Already exists"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn repo_permissions_decode() {
    let info: RepoInfo =
        serde_json::from_str(r#"{"id": 1, "permissions": {"admin": true, "push": true}}"#).unwrap();
    assert!(info.permissions.unwrap().admin);
    let info: RepoInfo = serde_json::from_str(r#"{"id": 1}"#).unwrap();
    assert!(info.permissions.is_none());
}

#[test]
fn installation_admin_requires_write() {
    let inst: Installation =
        serde_json::from_str(r#"{"id": 9, "permissions": {"administration": "write"}}"#).unwrap();
    assert!(inst.has_admin());
    let inst: Installation =
        serde_json::from_str(r#"{"id": 9, "permissions": {"administration": "read"}}"#).unwrap();
    assert!(!inst.has_admin());
}

#[test]
fn blank_token_is_no_credential() {
    let client = GitHubClient::new(DEFAULT_API_URL, Some("  ".to_string())).unwrap();
    assert!(!client.has_credential());
    let client = GitHubClient::new(DEFAULT_API_URL, Some("ghp_x".to_string())).unwrap();
    assert!(client.has_credential());
}

#[tokio::test]
async fn calls_without_token_fail_before_network() {
    let client = GitHubClient::new("http://127.0.0.1:9", None).unwrap();
    let err = client.list_queued_work("acme", "widgets").await.unwrap_err();
    assert!(matches!(err, PlatformError::MissingToken));
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let client = GitHubClient::new("https://ghe.example.com/api/v3/", None).unwrap();
    assert_eq!(client.base_url, "https://ghe.example.com/api/v3");
}
