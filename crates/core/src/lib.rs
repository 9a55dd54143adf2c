// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jitr-core: shared data model for the jitr runner orchestrator

pub mod macros;

pub mod clock;
pub mod container;
pub mod credential;
pub mod job;
pub mod policy;
pub mod registration;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use container::{NamedContainerEntry, LABEL_NAME, LABEL_OWNER, LABEL_REPOSITORY};
pub use credential::{EphemeralCredential, QueuedWork};
pub use job::{JobState, JobStatus};
pub use policy::Policy;
pub use registration::{Registration, SELF_HOSTED_LABEL};
pub use status::DaemonStatus;
