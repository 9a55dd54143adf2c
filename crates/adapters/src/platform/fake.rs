// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted CI platform for tests.

use super::{CiPlatform, PlatformError};
use async_trait::async_trait;
use jitr_core::{EphemeralCredential, QueuedWork};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Recorded credential mint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    pub owner: String,
    pub repo: String,
    pub name: String,
    pub labels: Vec<String>,
}

#[derive(Default)]
struct FakePlatformState {
    authenticated: bool,
    queued: HashMap<String, Vec<QueuedWork>>,
    failing_polls: HashSet<String>,
    failing_mints: HashSet<String>,
    admin: HashSet<String>,
    installed: HashSet<String>,
    mints: Vec<MintCall>,
    polls: Vec<String>,
    next_runner_id: u64,
}

/// Fake platform: queued work and failures are set per `owner/repo`.
#[derive(Clone)]
pub struct FakePlatform {
    inner: Arc<Mutex<FakePlatformState>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakePlatformState {
                authenticated: true,
                next_runner_id: 1,
                ..FakePlatformState::default()
            })),
        }
    }
}

fn key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.inner.lock().authenticated = authenticated;
    }

    /// Replace the queued work returned for `owner/repo`.
    pub fn set_queued(&self, owner: &str, repo: &str, work: Vec<QueuedWork>) {
        self.inner.lock().queued.insert(key(owner, repo), work);
    }

    pub fn fail_polls(&self, owner: &str, repo: &str, fail: bool) {
        let mut inner = self.inner.lock();
        if fail {
            inner.failing_polls.insert(key(owner, repo));
        } else {
            inner.failing_polls.remove(&key(owner, repo));
        }
    }

    pub fn fail_mints(&self, owner: &str, repo: &str) {
        self.inner.lock().failing_mints.insert(key(owner, repo));
    }

    pub fn grant_admin(&self, owner: &str, repo: &str) {
        self.inner.lock().admin.insert(key(owner, repo));
    }

    pub fn install(&self, owner: &str, repo: &str) {
        self.inner.lock().installed.insert(key(owner, repo));
    }

    pub fn mints(&self) -> Vec<MintCall> {
        self.inner.lock().mints.clone()
    }

    /// `owner/repo` of every poll, in order.
    pub fn polls(&self) -> Vec<String> {
        self.inner.lock().polls.clone()
    }
}

#[async_trait]
impl CiPlatform for FakePlatform {
    fn has_credential(&self) -> bool {
        self.inner.lock().authenticated
    }

    async fn generate_ephemeral_credential(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        labels: &[String],
    ) -> Result<EphemeralCredential, PlatformError> {
        let mut inner = self.inner.lock();
        if inner.failing_mints.contains(&key(owner, repo)) {
            return Err(PlatformError::Status {
                path: format!("/repos/{}/{}/actions/runners/generate-jitconfig", owner, repo),
                status: 422,
                body: "fake mint failure".to_string(),
            });
        }
        inner.mints.push(MintCall {
            owner: owner.to_string(),
            repo: repo.to_string(),
            name: name.to_string(),
            labels: labels.to_vec(),
        });
        let id = inner.next_runner_id;
        inner.next_runner_id += 1;
        Ok(EphemeralCredential::new(id, format!("jit-{}-{}", id, name)))
    }

    async fn list_queued_work(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<QueuedWork>, PlatformError> {
        let mut inner = self.inner.lock();
        let k = key(owner, repo);
        inner.polls.push(k.clone());
        if inner.failing_polls.contains(&k) {
            return Err(PlatformError::Http(format!("fake poll failure for {}", k)));
        }
        Ok(inner.queued.get(&k).cloned().unwrap_or_default())
    }

    async fn check_admin_permission(&self, owner: &str, repo: &str) -> Result<bool, PlatformError> {
        Ok(self.inner.lock().admin.contains(&key(owner, repo)))
    }

    async fn check_installation(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(bool, bool), PlatformError> {
        let inner = self.inner.lock();
        let k = key(owner, repo);
        let installed = inner.installed.contains(&k);
        Ok((installed, installed && inner.admin.contains(&k)))
    }
}
