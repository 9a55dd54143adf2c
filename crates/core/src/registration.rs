// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository registrations watched by the daemon.

use serde::{Deserialize, Serialize};

/// Label every minted runner carries so `runs-on: self-hosted` routing works.
pub const SELF_HOSTED_LABEL: &str = "self-hosted";

/// A repository the daemon polls for queued work.
///
/// Loaded from configuration at startup and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub owner: String,
    pub repository: String,
    /// Comma-separated runner labels, e.g. `"gpu, linux"`.
    #[serde(default)]
    pub labels: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// When set, jobs for this repository reuse a long-lived container
    /// with this name instead of provisioning a fresh one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Registration {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            labels: String::new(),
            enabled: true,
            container_name: None,
        }
    }

    crate::setters! {
        into { labels: String }
        set { enabled: bool }
        option { container_name: String }
    }

    /// `owner/repository`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }

    /// Configured labels, trimmed, without empties or duplicates, in order.
    pub fn label_list(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for label in self.labels.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            if !out.iter().any(|l| l == label) {
                out.push(label.to_string());
            }
        }
        out
    }

    /// Labels to mint a runner with: `self-hosted` followed by the configured labels.
    pub fn runner_labels(&self) -> Vec<String> {
        let mut out = vec![SELF_HOSTED_LABEL.to_string()];
        for label in self.label_list() {
            if label != SELF_HOSTED_LABEL {
                out.push(label);
            }
        }
        out
    }

    /// Container name with surrounding whitespace removed; blank names count as unset.
    pub fn reuse_name(&self) -> Option<&str> {
        self.container_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
