// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Session configuration (`session.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Seconds added to the manual estimate for each manual job.
pub const DEFAULT_MANUAL_OVERHEAD_SECS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Tunables for one session. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Application owning the session; checked on resume when set.
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub manual_overhead_secs: f64,
    /// Append jobs generated by desired local jobs to the desired list.
    pub adopt_generated_jobs: bool,
    /// Resume even when a job definition changed since the snapshot.
    pub ignore_job_checksums: bool,
    /// Overrides the environment-derived state directory.
    pub state_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            title: None,
            manual_overhead_secs: DEFAULT_MANUAL_OVERHEAD_SECS,
            adopt_generated_jobs: true,
            ignore_job_checksums: false,
            state_dir: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        text.parse()
    }
}

impl std::str::FromStr for SessionConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
