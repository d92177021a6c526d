// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IaC executor backends.
//!
//! Each backend wraps one CLI behind plan / apply / destroy. The
//! [`ExecutorRegistry`] selects a backend by [`IacFormat`].

mod bicep;
mod cloudformation;
mod terraform;
mod workdir;

pub use bicep::BicepExecutor;
pub use cloudformation::CloudFormationExecutor;
pub use terraform::TerraformExecutor;
pub use workdir::materialize;

use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stratum_core::{ApplyOutcome, DeploymentInput, IacFormat, PlanResult};
use thiserror::Error;
use tokio::process::Command;

/// Errors from executor backends.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to prepare working directory: {0}")]
    Workdir(#[from] std::io::Error),
    #[error("{0}")]
    Spawn(String),
    #[error("{command} failed (exit {code}): {stderr}")]
    CommandFailed { command: String, code: i32, stderr: String },
    #[error("could not parse {command} output: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected {command} output: {reason}")]
    Unexpected { command: String, reason: String },
    #[error("invalid stack name {0:?}: only letters, digits and '-' are allowed")]
    InvalidStackName(String),
}

/// One IaC backend.
#[async_trait]
pub trait IacExecutor: Send + Sync + 'static {
    /// Format this backend handles.
    fn format(&self) -> IacFormat;

    /// Materialize `code` and report what applying it would change.
    async fn plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError>;

    /// Materialize `code` and deploy it.
    async fn apply(
        &self,
        code: &str,
        input: &DeploymentInput,
        plan: &PlanResult,
    ) -> Result<ApplyOutcome, ExecutorError>;

    /// Tear down the infrastructure named by `target`, as returned in
    /// [`ApplyOutcome::destroy_target`].
    async fn destroy(&self, target: &str) -> Result<(), ExecutorError>;
}

/// Lookup table from format to backend.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<IacFormat, Arc<dyn IacExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three CLI backends, working under `work_root`.
    pub fn with_defaults(work_root: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(TerraformExecutor::new(work_root));
        registry.register(BicepExecutor::new(work_root));
        registry.register(CloudFormationExecutor::new(work_root));
        registry
    }

    /// Register `executor` under its format, replacing any previous one.
    pub fn register(&mut self, executor: impl IacExecutor) -> &mut Self {
        self.insert(Arc::new(executor))
    }

    pub fn insert(&mut self, executor: Arc<dyn IacExecutor>) -> &mut Self {
        self.executors.insert(executor.format(), executor);
        self
    }

    pub fn get(&self, format: IacFormat) -> Option<Arc<dyn IacExecutor>> {
        self.executors.get(&format).cloned()
    }

    /// Registered formats, in declaration order.
    pub fn formats(&self) -> Vec<IacFormat> {
        IacFormat::ALL.iter().copied().filter(|f| self.executors.contains_key(f)).collect()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry").field("formats", &self.formats()).finish()
    }
}

/// Run a backend CLI and return its stdout, mapping failures to
/// [`ExecutorError`].
pub(crate) async fn run_cli(
    cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<String, ExecutorError> {
    let output = run_with_timeout(cmd, timeout, description).await.map_err(ExecutorError::Spawn)?;
    if !output.status.success() {
        return Err(ExecutorError::CommandFailed {
            command: description.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse CLI stdout as JSON.
pub(crate) fn parse_json(description: &str, stdout: &str) -> Result<serde_json::Value, ExecutorError> {
    serde_json::from_str(stdout)
        .map_err(|source| ExecutorError::Parse { command: description.to_string(), source })
}

fn unexpected(description: &str, reason: impl Into<String>) -> ExecutorError {
    ExecutorError::Unexpected { command: description.to_string(), reason: reason.into() }
}

/// Require CLI output to be a JSON object.
pub(crate) fn expect_object<'a>(
    description: &str,
    value: &'a serde_json::Value,
) -> Result<&'a serde_json::Map<String, serde_json::Value>, ExecutorError> {
    value.as_object().ok_or_else(|| unexpected(description, "expected a JSON object"))
}

/// The array under `key`; absent or null means empty.
pub(crate) fn array_field<'a>(
    description: &str,
    value: &'a serde_json::Value,
    key: &str,
) -> Result<&'a [serde_json::Value], ExecutorError> {
    match &value[key] {
        serde_json::Value::Null => Ok(&[][..]),
        serde_json::Value::Array(items) => Ok(items.as_slice()),
        _ => Err(unexpected(description, format!("'{}' is not an array", key))),
    }
}

/// The object under `key`; absent or null means `None`.
pub(crate) fn object_field<'a>(
    description: &str,
    value: &'a serde_json::Value,
    key: &str,
) -> Result<Option<&'a serde_json::Value>, ExecutorError> {
    let field = &value[key];
    match field {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(_) => Ok(Some(field)),
        _ => Err(unexpected(description, format!("'{}' is not an object", key))),
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecutorCall, FakeExecutor};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
