// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-deployment activity logs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use stratum_core::{format_utc, DeploymentLog};

/// Path of the activity log for `deployment_id` under `log_dir`.
pub fn deployment_log_path(log_dir: &Path, deployment_id: &str) -> PathBuf {
    log_dir.join("deployment").join(format!("{}.log", deployment_id))
}

/// Append-only logger mirroring deployment log entries to disk.
///
/// Writes human-readable timestamped lines to:
///   `<log_dir>/deployment/<deployment_id>.log`
///
/// Each `append()` call opens, writes, and closes the file.
#[derive(Debug, Clone)]
pub struct DeploymentLogger {
    log_dir: PathBuf,
}

impl DeploymentLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Append one entry.
    ///
    /// Format: `2026-01-30T08:14:09Z [info] message` with ` (resource)`
    /// appended when the entry names a resource.
    ///
    /// Failures are logged via tracing and never propagate.
    pub fn append(&self, deployment_id: &str, entry: &DeploymentLog) {
        let path = deployment_log_path(&self.log_dir, deployment_id);
        if let Err(e) = write_line(&path, entry) {
            tracing::warn!(
                deployment_id,
                error = %e,
                "failed to write deployment log"
            );
        }
    }
}

fn write_line(path: &Path, entry: &DeploymentLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = format_utc(entry.timestamp);
    match &entry.resource {
        Some(resource) => writeln!(file, "{} [{}] {} ({})", ts, entry.level, entry.message, resource),
        None => writeln!(file, "{} [{}] {}", ts, entry.level, entry.message),
    }
}

#[cfg(test)]
#[path = "deployment_logger_tests.rs"]
mod tests;
