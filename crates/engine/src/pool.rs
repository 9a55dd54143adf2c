// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named container pool.
//!
//! At most one job uses a named container at a time. Each name has its own
//! async lock, created on first use; holders of different names never
//! contend. Entries only change `in_use` while the name's lock is held.

use jitr_core::{Clock, NamedContainerEntry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("cancelled while waiting for container {0}")]
    Cancelled(String),
}

struct PoolInner<C> {
    entries: Mutex<HashMap<String, NamedContainerEntry>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    clock: C,
}

/// Registry of reusable containers, shared by clone.
pub struct NamedContainerPool<C: Clock> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Clock> Clone for NamedContainerPool<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: Clock> NamedContainerPool<C> {
    pub fn new(clock: C) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                entries: Mutex::new(HashMap::new()),
                locks: Mutex::new(HashMap::new()),
                clock,
            }),
        }
    }

    pub fn try_get(&self, name: &str) -> Option<NamedContainerEntry> {
        self.inner.entries.lock().get(name).cloned()
    }

    /// Insert or replace the entry for `entry.name`.
    pub fn register(&self, entry: NamedContainerEntry) {
        tracing::debug!(name = %entry.name, container_id = %entry.container_id, "registered named container");
        self.inner.entries.lock().insert(entry.name.clone(), entry);
    }

    pub fn remove(&self, name: &str) -> Option<NamedContainerEntry> {
        let removed = self.inner.entries.lock().remove(name);
        if let Some(ref entry) = removed {
            tracing::info!(name, container_id = %entry.container_id, "evicted named container");
        }
        removed
    }

    /// All entries, ordered by name.
    pub fn get_all(&self) -> Vec<NamedContainerEntry> {
        let mut entries: Vec<_> = self.inner.entries.lock().values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Wait for exclusive use of `name`.
    ///
    /// Marks an existing entry in use; the returned lease releases it on drop.
    pub async fn acquire(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerLease<C>, PoolError> {
        let lock = {
            let mut locks = self.inner.locks.lock();
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        let guard = tokio::select! {
            guard = lock.lock_owned() => guard,
            _ = cancel.cancelled() => return Err(PoolError::Cancelled(name.to_string())),
        };
        if let Some(entry) = self.inner.entries.lock().get_mut(name) {
            entry.in_use = true;
        }
        tracing::debug!(name, "acquired named container");
        Ok(ContainerLease { name: name.to_string(), inner: Arc::clone(&self.inner), _guard: guard })
    }
}

/// Exclusive hold on one container name.
pub struct ContainerLease<C: Clock> {
    name: String,
    inner: Arc<PoolInner<C>>,
    _guard: OwnedMutexGuard<()>,
}

impl<C: Clock> ContainerLease<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current entry for the held name, if any.
    pub fn entry(&self) -> Option<NamedContainerEntry> {
        self.inner.entries.lock().get(&self.name).cloned()
    }

    /// Register a freshly provisioned container under the held name, in use.
    pub fn register(&self, mut entry: NamedContainerEntry) {
        entry.name = self.name.clone();
        entry.in_use = true;
        tracing::info!(name = %entry.name, container_id = %entry.container_id, "registered named container");
        self.inner.entries.lock().insert(self.name.clone(), entry);
    }

    /// Drop the entry for the held name (its container is gone).
    pub fn evict(&self) -> Option<NamedContainerEntry> {
        self.inner.entries.lock().remove(&self.name)
    }
}

impl<C: Clock> Drop for ContainerLease<C> {
    fn drop(&mut self) {
        let now = self.inner.clock.epoch_ms();
        if let Some(entry) = self.inner.entries.lock().get_mut(&self.name) {
            entry.in_use = false;
            entry.last_used_at_ms = now;
        }
        tracing::debug!(name = %self.name, "released named container");
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
