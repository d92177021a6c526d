// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment requests, their validation, and query filters.

use crate::deployment::{Deployment, DeploymentStatus, Environment, IacFormat, TargetCloud};
use crate::id::DeploymentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of deployments returned by a listing.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// A string that did not match any accepted spelling of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value '{value}', expected one of: {}", .expected.join(", "))]
pub struct UnknownVariant {
    pub value: String,
    pub expected: &'static [&'static str],
}

/// Request rejected before any deployment was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid {field}: {source}")]
    UnknownValue {
        field: &'static str,
        #[source]
        source: UnknownVariant,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Optional knobs accepted with a deployment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOptions {
    /// Plan only; complete without applying
    #[serde(default)]
    pub dry_run: bool,
    /// Skip the production approval gate
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
    /// Azure resource group (Bicep)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    /// Cloud region (CloudFormation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Deployment submission as received on the wire.
///
/// Enum-valued fields stay strings here so that bad values surface as a
/// [`ValidationError`] from [`DeploymentRequest::validate`] rather than as a
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    #[serde(default)]
    pub blueprint_id: String,
    #[serde(default)]
    pub generation_job_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub target_cloud: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub options: DeploymentOptions,
}

/// A request whose fields have all been checked and parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInput {
    pub blueprint_id: String,
    pub generation_job_id: String,
    pub environment: Environment,
    pub target_cloud: TargetCloud,
    pub format: IacFormat,
    #[serde(default)]
    pub options: DeploymentOptions,
}

impl DeploymentRequest {
    pub fn new(
        blueprint_id: impl Into<String>,
        generation_job_id: impl Into<String>,
        environment: impl Into<String>,
        target_cloud: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            blueprint_id: blueprint_id.into(),
            generation_job_id: generation_job_id.into(),
            environment: environment.into(),
            target_cloud: target_cloud.into(),
            format: format.into(),
            options: DeploymentOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DeploymentOptions) -> Self {
        self.options = options;
        self
    }

    /// Check required fields and parse enum values.
    pub fn validate(&self) -> Result<DeploymentInput, ValidationError> {
        let blueprint_id = required("blueprintId", &self.blueprint_id)?;
        let generation_job_id = required("generationJobId", &self.generation_job_id)?;
        let environment = parse_field("environment", &self.environment)?;
        let target_cloud = parse_field("targetCloud", &self.target_cloud)?;
        let format = parse_field("format", &self.format)?;

        if self.options.parallelism == Some(0) {
            return Err(ValidationError::Invalid {
                field: "parallelism",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(DeploymentInput {
            blueprint_id,
            generation_job_id,
            environment,
            target_cloud,
            format,
            options: self.options.clone(),
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

fn parse_field<T>(field: &'static str, value: &str) -> Result<T, ValidationError>
where
    T: std::str::FromStr<Err = UnknownVariant>,
{
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    value.trim().parse().map_err(|source| ValidationError::UnknownValue { field, source })
}

/// Request to restore a previously recorded state version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub deployment_id: DeploymentId,
    /// Backed-up version to restore; the live state when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<u64>,
    #[serde(default)]
    pub reason: String,
}

impl RollbackRequest {
    pub fn new(deployment_id: impl Into<DeploymentId>, reason: impl Into<String>) -> Self {
        Self { deployment_id: deployment_id.into(), target_version: None, reason: reason.into() }
    }

    pub fn target_version(mut self, version: u64) -> Self {
        self.target_version = Some(version);
        self
    }
}

/// Filters for listing deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentFilter {
    #[serde(default)]
    pub blueprint_id: Option<String>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
    pub limit: usize,
}

impl Default for DeploymentFilter {
    fn default() -> Self {
        Self { blueprint_id: None, environment: None, status: None, limit: DEFAULT_LIST_LIMIT }
    }
}

impl DeploymentFilter {
    pub fn matches(&self, deployment: &Deployment) -> bool {
        self.blueprint_id.as_deref().map_or(true, |b| deployment.blueprint_id == b)
            && self.environment.map_or(true, |e| deployment.environment == e)
            && self.status.map_or(true, |s| deployment.status == s)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
