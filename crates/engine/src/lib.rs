// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jitr-engine: job execution, named container reuse and the polling daemon

pub mod config;
pub mod daemon;
pub mod executor;
pub mod pool;
pub mod worker_set;

pub use config::{ConfigError, ConfigSource, StaticConfig};
pub use daemon::{Daemon, DaemonError, DaemonEvent};
pub use executor::{
    ExecutorConfig, ExecutorError, ExistingContainer, JobExecutor, JobRequest, Prerequisites,
};
pub use pool::{ContainerLease, NamedContainerPool, PoolError};
pub use worker_set::WorkerSet;
