// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: child processes and the CI platform API.

pub mod platform;
pub mod subprocess;

pub use platform::{CiPlatform, GitHubClient, PlatformError, DEFAULT_API_URL};
pub use subprocess::{CommandOutput, CommandRunner, CommandSpec, ProcessError, SystemRunner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use platform::{FakePlatform, MintCall};
#[cfg(any(test, feature = "test-support"))]
pub use subprocess::FakeRunner;
