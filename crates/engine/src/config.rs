// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.
//!
//! Resolution order: built-in defaults, then the TOML file, then
//! environment variables.

use crate::env;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratum_adapters::DEFAULT_GENERATOR_URL;
use thiserror::Error;

/// Default shutdown drain timeout.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default code fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval at which shutdown polls for active deployments.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the code-generation service
    pub generator_url: String,
    /// Root for materialized working directories
    pub work_dir: PathBuf,
    /// Per-deployment log files are written here when set
    pub log_dir: Option<PathBuf>,
    pub drain_timeout: Duration,
    pub drain_poll_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator_url: DEFAULT_GENERATOR_URL.to_string(),
            work_dir: env::default_work_dir(),
            log_dir: None,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            drain_poll_interval: DRAIN_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    generator_url: Option<String>,
    work_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    drain_timeout_ms: Option<u64>,
    fetch_timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration.
    ///
    /// `path` (or `STRATUM_CONFIG` when `None`) names an optional TOML file;
    /// a named file that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(env::config_path);
        let mut config = match &path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        tracing::debug!(?config, file = ?path, "configuration loaded");
        Ok(config)
    }

    /// Defaults overlaid with the settings in `text`.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::default();
        if let Some(url) = file.generator_url {
            config.generator_url = url;
        }
        if let Some(dir) = file.work_dir {
            config.work_dir = dir;
        }
        if file.log_dir.is_some() {
            config.log_dir = file.log_dir;
        }
        if let Some(ms) = file.drain_timeout_ms {
            config.drain_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.fetch_timeout_ms {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(url) = env::generator_url() {
            self.generator_url = url;
        }
        if let Some(dir) = env::work_dir() {
            self.work_dir = dir;
        }
        if let Some(dir) = env::log_dir() {
            self.log_dir = Some(dir);
        }
        if let Some(timeout) = env::drain_timeout() {
            self.drain_timeout = timeout;
        }
        if let Some(timeout) = env::fetch_timeout() {
            self.fetch_timeout = timeout;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.generator_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "generator_url must be an http(s) URL, got '{}'",
                self.generator_url
            )));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
