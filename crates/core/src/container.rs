// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, reusable devcontainers.

use serde::{Deserialize, Serialize};

/// Container label carrying the pool name.
pub const LABEL_NAME: &str = "jitr.name";
/// Container label carrying the repository owner.
pub const LABEL_OWNER: &str = "jitr.owner";
/// Container label carrying the repository name.
pub const LABEL_REPOSITORY: &str = "jitr.repository";

/// A long-lived container kept alive across jobs.
///
/// `in_use` is only changed while holding the pool's lock for `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedContainerEntry {
    pub name: String,
    pub container_id: String,
    pub owner: String,
    pub repository: String,
    pub in_use: bool,
    pub created_at_ms: u64,
    pub last_used_at_ms: u64,
}

impl NamedContainerEntry {
    pub fn new(
        name: impl Into<String>,
        container_id: impl Into<String>,
        owner: impl Into<String>,
        repository: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            container_id: container_id.into(),
            owner: owner.into(),
            repository: repository.into(),
            in_use: false,
            created_at_ms: now_ms,
            last_used_at_ms: now_ms,
        }
    }
}

/// Label pairs tagged on every reusable container.
pub fn container_labels<'a>(
    name: &'a str,
    owner: &'a str,
    repository: &'a str,
) -> [(&'static str, &'a str); 3] {
    [(LABEL_NAME, name), (LABEL_OWNER, owner), (LABEL_REPOSITORY, repository)]
}
