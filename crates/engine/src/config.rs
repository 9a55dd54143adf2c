// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where the daemon gets its registrations and policy from.

use jitr_core::{Policy, Registration};
use std::path::PathBuf;
use thiserror::Error;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration collaborator, consulted once at daemon startup.
pub trait ConfigSource: Send + Sync + 'static {
    fn load_registrations(&self) -> Result<Vec<Registration>, ConfigError>;
    fn load_policy(&self) -> Result<Policy, ConfigError>;
}

/// In-memory configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    pub registrations: Vec<Registration>,
    pub policy: Policy,
}

impl StaticConfig {
    pub fn new(registrations: Vec<Registration>, policy: Policy) -> Self {
        Self { registrations, policy }
    }
}

impl ConfigSource for StaticConfig {
    fn load_registrations(&self) -> Result<Vec<Registration>, ConfigError> {
        Ok(self.registrations.clone())
    }

    fn load_policy(&self) -> Result<Policy, ConfigError> {
        Ok(self.policy)
    }
}
