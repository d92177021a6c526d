// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded child-process execution.

use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Backend "what would change" operations, including provider initialization.
pub const PLAN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Backend deploy operations.
pub const APPLY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Backend teardown operations.
pub const DESTROY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Short metadata queries (state dumps, outputs, stack descriptions).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// The child is killed if `timeout` elapses first. `description` names the
/// command in errors and logs. A non-zero exit is not an error here; callers
/// inspect `Output::status`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, cmd.output()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(output)) => {
            tracing::debug!(
                command = description,
                exit = output.status.code().unwrap_or(-1),
                elapsed_ms,
                "subprocess finished"
            );
            Ok(output)
        }
        Ok(Err(e)) => Err(format!("{} failed to start: {}", description, e)),
        Err(_) => {
            tracing::warn!(command = description, elapsed_ms, "subprocess timed out, killed");
            Err(format!("{} timed out after {}s", description, timeout.as_secs()))
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
