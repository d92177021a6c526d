// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use stratum_adapters::{CodeSourceError, ExecutorError};
use stratum_core::{DeploymentId, IacFormat, ValidationError};
use stratum_storage::StateError;
use thiserror::Error;

/// Errors returned synchronously by orchestrator operations.
///
/// Failures inside a running deployment are recorded on the deployment
/// instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("deployment not found: {0}")]
    NotFound(DeploymentId),
    #[error("deployment {0} is still running")]
    Busy(DeploymentId),
    #[error("deployment {0} has no recorded infrastructure")]
    NothingToDestroy(DeploymentId),
    #[error("no executor registered for format {0}")]
    UnsupportedFormat(IacFormat),
    #[error("orchestrator is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    CodeSource(#[from] CodeSourceError),
}
