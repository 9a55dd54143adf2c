// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST implementation of [`CiPlatform`].

use super::{CiPlatform, PlatformError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jitr_core::{EphemeralCredential, QueuedWork};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default API root for github.com. GHES uses `https://<host>/api/v3`.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const DEFAULT_RUNNER_GROUP: u64 = 1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub Actions client authenticated with a personal or app token.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    runner_group_id: u64,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("jitr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            runner_group_id: DEFAULT_RUNNER_GROUP,
        })
    }

    /// Register runners into a specific runner group instead of the default one.
    pub fn with_runner_group(mut self, runner_group_id: u64) -> Self {
        self.runner_group_id = runner_group_id;
        self
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, PlatformError> {
        let token = self.token.as_deref().ok_or(PlatformError::MissingToken)?;
        Ok(req
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        req: RequestBuilder,
    ) -> Result<T, PlatformError> {
        let resp = self
            .authed(req)?
            .send()
            .await
            .map_err(|e| PlatformError::Http(format!("{}: {}", path, e.without_url())))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(path, status, &body));
        }
        resp.json::<T>().await.map_err(|e| PlatformError::Decode {
            path: path.to_string(),
            reason: e.without_url().to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        self.send(path, self.http.get(url)).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        self.send(path, self.http.post(url).json(body)).await
    }
}

#[async_trait]
impl CiPlatform for GitHubClient {
    fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    async fn generate_ephemeral_credential(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        labels: &[String],
    ) -> Result<EphemeralCredential, PlatformError> {
        let path = format!("/repos/{}/{}/actions/runners/generate-jitconfig", owner, repo);
        let body = JitConfigRequest {
            name,
            runner_group_id: self.runner_group_id,
            labels,
            work_folder: "_work",
        };
        let resp: JitConfigResponse = self.post(&path, &body).await?;
        tracing::info!(owner, repo, name, runner_id = resp.runner.id, "minted jit runner config");
        Ok(EphemeralCredential::new(resp.runner.id, resp.encoded_jit_config))
    }

    async fn list_queued_work(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<QueuedWork>, PlatformError> {
        let path = format!("/repos/{}/{}/actions/runs?status=queued&per_page=100", owner, repo);
        let runs: WorkflowRuns = self.get(&path).await?;
        Ok(runs.into_queued_work())
    }

    async fn check_admin_permission(&self, owner: &str, repo: &str) -> Result<bool, PlatformError> {
        let path = format!("/repos/{}/{}", owner, repo);
        match self.get::<RepoInfo>(&path).await {
            Ok(info) => Ok(info.permissions.map(|p| p.admin).unwrap_or(false)),
            Err(e) if e.is_access_denied() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn check_installation(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(bool, bool), PlatformError> {
        let path = format!("/repos/{}/{}/installation", owner, repo);
        match self.get::<Installation>(&path).await {
            Ok(installation) => Ok((true, installation.has_admin())),
            Err(e) if e.is_access_denied() => Ok((false, false)),
            Err(e) => Err(e),
        }
    }
}

/// Map a non-success HTTP status onto a [`PlatformError`].
fn classify_status(path: &str, status: StatusCode, body: &str) -> PlatformError {
    let message = error_message(body).unwrap_or_else(|| body.trim().to_string());
    match status.as_u16() {
        401 | 403 => PlatformError::Unauthorized(format!("{}: {}", path, message)),
        404 => PlatformError::NotFound(path.to_string()),
        code => PlatformError::Status { path: path.to_string(), status: code, body: message },
    }
}

/// GitHub error bodies look like `{"message": "...", "documentation_url": "..."}`.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[derive(Serialize)]
struct JitConfigRequest<'a> {
    name: &'a str,
    runner_group_id: u64,
    labels: &'a [String],
    work_folder: &'a str,
}

#[derive(Deserialize)]
struct JitConfigResponse {
    runner: JitRunner,
    encoded_jit_config: String,
}

#[derive(Deserialize)]
struct JitRunner {
    id: u64,
}

#[derive(Deserialize)]
struct WorkflowRuns {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct WorkflowRun {
    id: u64,
    head_branch: Option<String>,
    created_at: DateTime<Utc>,
}

impl WorkflowRuns {
    /// Oldest first; runs without a head branch (e.g. deleted refs) cannot be cloned and are skipped.
    fn into_queued_work(self) -> Vec<QueuedWork> {
        let mut work: Vec<QueuedWork> = self
            .workflow_runs
            .into_iter()
            .filter_map(|run| match run.head_branch {
                Some(branch) if !branch.is_empty() => Some(QueuedWork::new(
                    run.id,
                    branch,
                    run.created_at.timestamp_millis().max(0) as u64,
                )),
                _ => {
                    tracing::debug!(run_id = run.id, "skipping queued run without head branch");
                    None
                }
            })
            .collect();
        work.sort_by_key(|w| (w.created_at_ms, w.id));
        work
    }
}

#[derive(Deserialize)]
struct RepoInfo {
    permissions: Option<RepoPermissions>,
}

#[derive(Deserialize)]
struct RepoPermissions {
    #[serde(default)]
    admin: bool,
}

#[derive(Deserialize)]
struct Installation {
    #[serde(default)]
    permissions: HashMap<String, String>,
}

impl Installation {
    fn has_admin(&self) -> bool {
        self.permissions.get("administration").map(|level| level == "write").unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
