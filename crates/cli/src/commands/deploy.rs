// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `stratum deploy`: run one deployment to completion in-process.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use stratum_core::{DeploymentId, DeploymentOptions, DeploymentRequest, DeploymentStatus};
use stratum_engine::{Config, Orchestrator, OrchestratorError};

use crate::exit_error::ExitError;
use crate::output::{emit, format_deployment, OutputFormat};

/// How often the command checks whether the deployment has settled.
const SETTLE_POLL: Duration = Duration::from_millis(200);

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Blueprint the generated code belongs to
    #[arg(long)]
    pub blueprint: String,
    /// Code generation job to fetch the IaC code from
    #[arg(long = "generation-job")]
    pub generation_job: String,
    /// Target environment (dev, staging, production)
    #[arg(long)]
    pub environment: String,
    /// Target cloud (azure, aws, gcp, on-premise)
    #[arg(long)]
    pub cloud: String,
    /// IaC format (terraform, bicep, cloudformation)
    #[arg(long)]
    pub format: String,
    /// Apply production deployments without waiting for approval
    #[arg(long)]
    pub auto_approve: bool,
    /// Plan only
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub parallelism: Option<u32>,
    /// Azure resource group (bicep)
    #[arg(long)]
    pub resource_group: Option<String>,
    /// AWS region (cloudformation)
    #[arg(long)]
    pub region: Option<String>,
}

impl DeployArgs {
    pub fn to_request(&self) -> DeploymentRequest {
        DeploymentRequest::new(
            &self.blueprint,
            &self.generation_job,
            &self.environment,
            &self.cloud,
            &self.format,
        )
        .with_options(DeploymentOptions {
            dry_run: self.dry_run,
            auto_approve: self.auto_approve,
            parallelism: self.parallelism,
            resource_group: self.resource_group.clone(),
            region: self.region.clone(),
        })
    }
}

pub async fn handle(
    args: &DeployArgs,
    config: &Config,
    state_file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    if let Some(path) = state_file {
        orchestrator.state_store().load_snapshot(path)?;
    }

    let started = match orchestrator.start_deployment(&args.to_request()) {
        Ok(deployment) => deployment,
        Err(OrchestratorError::Validation(e)) => return Err(ExitError::invalid(e.to_string()).into()),
        Err(e) => return Err(e.into()),
    };
    let id = started.id;

    let interrupted = tokio::select! {
        _ = wait_settled(&orchestrator, &id) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        tracing::warn!(deployment_id = %id, "interrupted, cancelling deployment");
        orchestrator.cancel_deployment(&id);
    }
    let abandoned = orchestrator.shutdown().await;
    if !abandoned.is_empty() {
        tracing::warn!(deployment_id = %id, "exiting with the deployment still running");
    }

    let deployment =
        orchestrator.get_deployment(&id).ok_or_else(|| anyhow!("deployment {} disappeared", id))?;
    if let Some(path) = state_file {
        orchestrator.state_store().save_snapshot(path)?;
    }
    emit(&deployment, format, format_deployment)?;

    if deployment.status == DeploymentStatus::Failed {
        let reason = deployment.error.as_deref().unwrap_or("unknown error");
        return Err(ExitError::failed(format!("deployment {} failed: {}", id, reason)).into());
    }
    Ok(())
}

/// Resolve once execution has ended: terminal, or parked at the approval gate.
async fn wait_settled(orchestrator: &Orchestrator, id: &DeploymentId) {
    while orchestrator.is_active(id) {
        tokio::time::sleep(SETTLE_POLL).await;
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
