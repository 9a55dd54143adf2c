// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration file.
//!
//! ```toml
//! [policy]
//! poll_interval_secs = 30
//! max_concurrent_jobs = 2
//!
//! [github]
//! api_url = "https://ghe.example.com/api/v3"
//! runner_group_id = 1
//!
//! [executor]
//! engine = "podman"
//!
//! [[registration]]
//! owner = "acme"
//! repository = "widgets"
//! labels = "gpu, linux"
//! container_name = "widgets-gpu"
//! ```

use jitr_core::{Policy, Registration};
use jitr_engine::{ConfigError, ConfigSource, ExecutorConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default, rename = "registration")]
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubSection {
    pub api_url: Option<String>,
    pub runner_group_id: Option<u64>,
}

/// Overrides for [`ExecutorConfig`]; unset keys keep the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    pub engine: Option<String>,
    pub devcontainer: Option<String>,
    pub git: Option<String>,
    pub work_root: Option<PathBuf>,
    pub agent_version: Option<String>,
    pub agent_download_base: Option<String>,
    pub git_host: Option<String>,
    pub clone_timeout_secs: Option<u64>,
    pub up_timeout_secs: Option<u64>,
    pub install_timeout_secs: Option<u64>,
    pub engine_timeout_secs: Option<u64>,
}

impl ExecutorSection {
    pub fn apply(&self, mut config: ExecutorConfig) -> ExecutorConfig {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn secs(slot: &mut Duration, value: Option<u64>) {
            if let Some(v) = value {
                *slot = Duration::from_secs(v);
            }
        }
        set(&mut config.engine, &self.engine);
        set(&mut config.devcontainer, &self.devcontainer);
        set(&mut config.git, &self.git);
        set(&mut config.work_root, &self.work_root);
        set(&mut config.agent_version, &self.agent_version);
        set(&mut config.agent_download_base, &self.agent_download_base);
        set(&mut config.git_host, &self.git_host);
        secs(&mut config.clone_timeout, self.clone_timeout_secs);
        secs(&mut config.up_timeout, self.up_timeout_secs);
        secs(&mut config.install_timeout, self.install_timeout_secs);
        secs(&mut config.engine_timeout, self.engine_timeout_secs);
        config
    }
}

impl FileConfig {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(text)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names: HashMap<&str, String> = HashMap::new();
        for (index, reg) in self.registrations.iter().enumerate() {
            if reg.owner.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("registration {} has an empty `owner`", index + 1)));
            }
            if reg.repository.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "registration {} has an empty `repository`",
                    index + 1
                )));
            }
            // Named containers are labelled with one repository.
            if let Some(name) = reg.reuse_name() {
                if let Some(other) = names.get(name) {
                    if *other != reg.slug() {
                        return Err(ConfigError::Invalid(format!(
                            "container name `{}` is used by both {} and {}",
                            name,
                            other,
                            reg.slug()
                        )));
                    }
                }
                names.insert(name, reg.slug());
            }
        }
        Ok(())
    }
}

/// [`ConfigSource`] backed by a TOML file, read once when opened.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    config: FileConfig,
}

impl FileConfigSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        let config = FileConfig::parse(&path, &text)?;
        tracing::debug!(path = %path.display(), registrations = config.registrations.len(), "loaded config");
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }
}

impl ConfigSource for FileConfigSource {
    fn load_registrations(&self) -> Result<Vec<Registration>, ConfigError> {
        Ok(self.config.registrations.clone())
    }

    fn load_policy(&self) -> Result<Policy, ConfigError> {
        Ok(self.config.policy)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
