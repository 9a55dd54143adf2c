// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jitr-daemon: environment, config file and process lifecycle for `jitrd`

pub mod config;
pub mod env;
pub mod lifecycle;

pub use config::{ExecutorSection, FileConfig, FileConfigSource, GitHubSection};
pub use lifecycle::{Config, LifecycleError};
