// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::path::PathBuf;
use std::time::Duration;

/// Config file path (`STRATUM_CONFIG`)
pub fn config_path() -> Option<PathBuf> {
    non_empty("STRATUM_CONFIG").map(PathBuf::from)
}

/// Code-generation service base URL: `STRATUM_GENERATOR_URL` > `IAC_GENERATOR_URL`.
///
/// `IAC_GENERATOR_URL` names the service root, so `/api` is appended.
pub fn generator_url() -> Option<String> {
    non_empty("STRATUM_GENERATOR_URL").or_else(|| {
        non_empty("IAC_GENERATOR_URL").map(|url| format!("{}/api", url.trim_end_matches('/')))
    })
}

/// Root for materialized working directories (`STRATUM_WORK_DIR`)
pub fn work_dir() -> Option<PathBuf> {
    non_empty("STRATUM_WORK_DIR").map(PathBuf::from)
}

/// Directory for per-deployment log files (`STRATUM_LOG_DIR`)
pub fn log_dir() -> Option<PathBuf> {
    non_empty("STRATUM_LOG_DIR").map(PathBuf::from)
}

/// Shutdown drain timeout override (`STRATUM_DRAIN_TIMEOUT_MS`)
pub fn drain_timeout() -> Option<Duration> {
    millis("STRATUM_DRAIN_TIMEOUT_MS")
}

/// Code fetch timeout override (`STRATUM_FETCH_TIMEOUT_MS`)
pub fn fetch_timeout() -> Option<Duration> {
    millis("STRATUM_FETCH_TIMEOUT_MS")
}

/// Default working directory root: XDG_STATE_HOME/stratum/work > ~/.local/state/stratum/work
pub fn default_work_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .unwrap_or_else(std::env::temp_dir)
        .join("stratum")
        .join("work")
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn millis(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}
