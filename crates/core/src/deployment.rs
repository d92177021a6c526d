// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment record and lifecycle state machine.

use crate::id::DeploymentId;
use crate::request::{DeploymentInput, DeploymentOptions};
use crate::state::DeploymentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Target environment of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Dev,
    Staging,
    Production,
}

crate::wire_enum! {
    Environment {
        Dev => "dev",
        Staging => "staging",
        Production => "production",
    }
}

/// Cloud the generated code targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetCloud {
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "aws")]
    Aws,
    #[serde(rename = "gcp")]
    Gcp,
    #[serde(rename = "on-premise")]
    OnPremise,
}

crate::wire_enum! {
    TargetCloud {
        Azure => "azure",
        Aws => "aws",
        Gcp => "gcp",
        OnPremise => "on-premise",
    }
}

/// IaC dialect of the generated code; selects the executor backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IacFormat {
    Terraform,
    Bicep,
    CloudFormation,
}

crate::wire_enum! {
    IacFormat {
        Terraform => "terraform",
        Bicep => "bicep",
        CloudFormation => "cloudformation",
    }
}

/// Lifecycle status of a deployment.
///
/// ```text
/// pending ─► planning ─► applying ─► completed ─► rolled_back
///    │           │  └──(dry run)──────►▲
///    └───────────┴──────────┴──► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Planning,
    Applying,
    Completed,
    Failed,
    RolledBack,
}

crate::wire_enum! {
    DeploymentStatus {
        Pending => "pending",
        Planning => "planning",
        Applying => "applying",
        Completed => "completed",
        Failed => "failed",
        RolledBack => "rolled_back",
    }
}

impl DeploymentStatus {
    /// Terminal statuses carry a `completed_at` timestamp.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (self, next),
            (Pending, Planning)
                | (Pending, Failed)
                | (Planning, Applying)
                | (Planning, Completed)
                | (Planning, Failed)
                | (Applying, Completed)
                | (Applying, Failed)
                | (Completed, RolledBack)
        )
    }
}

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition from {from} to {to}")]
pub struct TransitionError {
    pub from: DeploymentStatus,
    pub to: DeploymentStatus,
}

/// Severity of a deployment log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

/// One entry in a deployment's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// One attempted rollout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: DeploymentId,
    pub blueprint_id: String,
    pub generation_job_id: String,
    pub environment: Environment,
    pub target_cloud: TargetCloud,
    pub format: IacFormat,
    #[serde(default)]
    pub options: DeploymentOptions,
    pub status: DeploymentStatus,
    /// Backend outputs, populated only on success
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, serde_json::Value>,
    /// Failure reason, set only on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Vec<DeploymentLog>,
    /// State store key for this deployment's infrastructure.
    ///
    /// Equal to `id` for ordinary deployments; rollbacks inherit the key of
    /// the deployment they restore so versions keep counting up.
    pub state_key: DeploymentId,
    /// Deployment this one rolled back, if it is a rollback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_of: Option<DeploymentId>,
    /// State written for this deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<DeploymentState>,
    /// Backend-specific identifier needed to tear the infrastructure down
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy_target: Option<String>,
}

impl Deployment {
    /// Create a new `pending` deployment from a validated request.
    pub fn new(input: &DeploymentInput, at: DateTime<Utc>) -> Self {
        let id = DeploymentId::new();
        Self {
            state_key: id.clone(),
            id,
            blueprint_id: input.blueprint_id.clone(),
            generation_job_id: input.generation_job_id.clone(),
            environment: input.environment,
            target_cloud: input.target_cloud,
            format: input.format,
            options: input.options.clone(),
            status: DeploymentStatus::Pending,
            outputs: BTreeMap::new(),
            error: None,
            created_at: at,
            started_at: None,
            completed_at: None,
            logs: Vec::new(),
            rollback_of: None,
            state: None,
            destroy_target: None,
        }
    }

    /// Create the `applying` deployment that restores `original`'s state.
    pub fn rollback_of(original: &Deployment, at: DateTime<Utc>) -> Self {
        Self {
            id: DeploymentId::new(),
            blueprint_id: original.blueprint_id.clone(),
            generation_job_id: original.generation_job_id.clone(),
            environment: original.environment,
            target_cloud: original.target_cloud,
            format: original.format,
            options: original.options.clone(),
            status: DeploymentStatus::Applying,
            outputs: BTreeMap::new(),
            error: None,
            created_at: at,
            started_at: Some(at),
            completed_at: None,
            logs: Vec::new(),
            state_key: original.state_key.clone(),
            rollback_of: Some(original.id.clone()),
            state: None,
            destroy_target: original.destroy_target.clone(),
        }
    }

    /// The request this deployment was created from.
    pub fn input(&self) -> DeploymentInput {
        DeploymentInput {
            blueprint_id: self.blueprint_id.clone(),
            generation_job_id: self.generation_job_id.clone(),
            environment: self.environment,
            target_cloud: self.target_cloud,
            format: self.format,
            options: self.options.clone(),
        }
    }

    /// Whether execution must stop after planning for a manual approval.
    pub fn requires_approval(&self) -> bool {
        self.environment == Environment::Production && !self.options.auto_approve
    }

    /// Move to `next`, stamping `started_at` on entering `applying` and
    /// `completed_at` on entering a terminal status.
    pub fn transition(
        &mut self,
        next: DeploymentStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError { from: self.status, to: next });
        }
        if next == DeploymentStatus::Applying && self.started_at.is_none() {
            self.started_at = Some(at);
        }
        if next.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
        self.status = next;
        Ok(())
    }

    /// Transition to `failed` and record the reason.
    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(DeploymentStatus::Failed, at)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Append a log entry.
    pub fn push_log(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        resource: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.logs.push(DeploymentLog { timestamp: at, level, message: message.into(), resource });
    }

    /// Elapsed milliseconds between creation and completion, if completed.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at.map(|done| (done - self.created_at).num_milliseconds())
    }
}

#[cfg(test)]
#[path = "deployment_tests.rs"]
mod tests;
