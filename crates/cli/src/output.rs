// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;
use stratum_core::{format_elapsed_ms, format_utc, Deployment, DeploymentState, StateBackup};

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON or as the text `render` produces.
pub fn emit<T: Serialize>(
    value: &T,
    format: OutputFormat,
    render: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render(value)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Multi-line summary of a deployment followed by its log.
pub fn format_deployment(deployment: &Deployment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", color::header("Deployment"), deployment.id);
    let _ = writeln!(out, "  Status:    {}", color::status(deployment.status));
    let _ = writeln!(
        out,
        "  Blueprint: {} ({}, {}, {})",
        deployment.blueprint_id, deployment.environment, deployment.target_cloud, deployment.format
    );
    if let Some(original) = &deployment.rollback_of {
        let _ = writeln!(out, "  Rollback:  of {}", original);
    }
    if let Some(error) = &deployment.error {
        let _ = writeln!(out, "  Error:     {}", error);
    }
    if let Some(state) = &deployment.state {
        let _ = writeln!(
            out,
            "  State:     version {}, {} resource(s)",
            state.version,
            state.resources.len()
        );
    }
    for (name, value) in &deployment.outputs {
        let _ = writeln!(out, "  Output:    {} = {}", name, value);
    }
    if let Some(ms) = deployment.duration_ms() {
        let _ = writeln!(out, "  Duration:  {}", format_elapsed_ms(ms.max(0) as u64));
    }
    if !deployment.logs.is_empty() {
        let _ = writeln!(out, "{}", color::header("Logs"));
        for entry in &deployment.logs {
            let _ = write!(
                out,
                "  {} [{}] {}",
                color::muted(&format_utc(entry.timestamp)),
                entry.level,
                entry.message
            );
            if let Some(resource) = &entry.resource {
                let _ = write!(out, " ({})", resource);
            }
            out.push('\n');
        }
    }
    out
}

/// Live state with one line per resource.
pub fn format_state(state: &DeploymentState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} version {} (modified {})",
        color::header("State"),
        state.version,
        format_utc(state.last_modified)
    );
    if let Some(lock) = &state.lock_info {
        let _ = writeln!(
            out,
            "  Locked by {} for {} since {} (lock {})",
            lock.who,
            lock.operation,
            format_utc(lock.created),
            lock.id
        );
    }
    for resource in &state.resources {
        let _ = writeln!(
            out,
            "  {:<32} {:<24} {}",
            format!("{}.{}", resource.resource_type, resource.name),
            resource.id,
            resource.status
        );
    }
    out
}

/// Backups, newest first.
pub fn format_history(history: &[StateBackup]) -> String {
    if history.is_empty() {
        return "No backups\n".to_string();
    }
    let mut out = String::new();
    for backup in history {
        let _ = writeln!(
            out,
            "  v{:<4} {}  {} resource(s)",
            backup.version,
            format_utc(backup.created_at),
            backup.state.resources.len()
        );
    }
    out
}
