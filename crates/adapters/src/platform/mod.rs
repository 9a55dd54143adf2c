// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CI platform contract.
//!
//! The daemon needs four things from the platform: mint a single-use runner
//! credential, list queued runs, and two permission probes used by setup
//! flows. [`GitHubClient`] implements them against the GitHub REST API.

mod github;

pub use github::{GitHubClient, DEFAULT_API_URL};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePlatform, MintCall};

use async_trait::async_trait;
use jitr_core::{EphemeralCredential, QueuedWork};
use thiserror::Error;

/// Errors from CI platform calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("no platform token configured")]
    MissingToken,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{path} returned {status}: {body}")]
    Status { path: String, status: u16, body: String },
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl PlatformError {
    /// Permission or not-found responses that probes treat as "no access".
    pub fn is_access_denied(&self) -> bool {
        matches!(self, PlatformError::Unauthorized(_) | PlatformError::NotFound(_))
    }
}

/// Narrow view of the CI platform used by the daemon and executor.
#[async_trait]
pub trait CiPlatform: Clone + Send + Sync + 'static {
    /// True when a token is available to authenticate API calls.
    fn has_credential(&self) -> bool;

    /// Mint a fresh single-use runner credential. Every call returns a new one.
    async fn generate_ephemeral_credential(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        labels: &[String],
    ) -> Result<EphemeralCredential, PlatformError>;

    /// Workflow runs currently queued for the repository.
    async fn list_queued_work(&self, owner: &str, repo: &str)
        -> Result<Vec<QueuedWork>, PlatformError>;

    /// Whether the token has admin rights on the repository.
    ///
    /// Degrades to `false` on permission or not-found responses.
    async fn check_admin_permission(&self, owner: &str, repo: &str) -> Result<bool, PlatformError>;

    /// `(installed, has_admin)` for the platform app on the repository.
    ///
    /// Degrades to `(false, false)` on permission or not-found responses.
    async fn check_installation(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(bool, bool), PlatformError>;
}
