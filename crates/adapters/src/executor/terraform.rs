// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terraform backend.

use super::{
    array_field, expect_object, materialize, object_field, parse_json, run_cli, ExecutorError,
    IacExecutor,
};
use crate::subprocess::{APPLY_TIMEOUT, DESTROY_TIMEOUT, METADATA_TIMEOUT, PLAN_TIMEOUT};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use stratum_core::{
    ApplyOutcome, ChangeSummary, DeploymentInput, DeploymentState, IacFormat, PlanResult,
    ResourceState, ResourceStatus,
};
use tokio::process::Command;
use tracing::Instrument;

const MAIN_FILE: &str = "main.tf";
const PLAN_FILE: &str = "tfplan";

/// Drives the `terraform` CLI.
///
/// `destroy` expects the working directory recorded by `apply`.
#[derive(Debug, Clone)]
pub struct TerraformExecutor {
    work_root: PathBuf,
    binary: PathBuf,
}

impl TerraformExecutor {
    pub fn new(work_root: &Path) -> Self {
        Self { work_root: work_root.to_path_buf(), binary: PathBuf::from("terraform") }
    }

    /// Use a different `terraform` binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).current_dir(dir).env("TF_IN_AUTOMATION", "1");
        cmd
    }

    async fn init(&self, dir: &Path) -> Result<(), ExecutorError> {
        let cmd = self.command(dir, &["init", "-input=false", "-no-color"]);
        run_cli(cmd, PLAN_TIMEOUT, "terraform init").await?;
        Ok(())
    }

    async fn show(&self, dir: &Path, plan_file: Option<&str>) -> Result<Value, ExecutorError> {
        let mut args = vec!["show", "-json"];
        args.extend(plan_file);
        let stdout = run_cli(self.command(dir, &args), METADATA_TIMEOUT, "terraform show").await?;
        parse_json("terraform show", &stdout)
    }
}

fn parallelism_flag(input: &DeploymentInput) -> Option<String> {
    input.options.parallelism.map(|n| format!("-parallelism={}", n))
}

impl TerraformExecutor {
    async fn run_plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let start = Instant::now();
        let dir = materialize(&self.work_root, "terraform", MAIN_FILE, code).await?;
        self.init(&dir).await?;

        let parallelism = parallelism_flag(input);
        let mut args = vec!["plan", "-input=false", "-no-color", "-out=tfplan"];
        args.extend(parallelism.as_deref());
        run_cli(self.command(&dir, &args), PLAN_TIMEOUT, "terraform plan").await?;

        let plan = parse_plan(self.show(&dir, Some(PLAN_FILE)).await?)?;
        tracing::info!(
            resource_count = plan.resource_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "terraform plan finished"
        );
        Ok(plan)
    }

    async fn run_apply(&self, code: &str, input: &DeploymentInput) -> Result<ApplyOutcome, ExecutorError> {
        let start = Instant::now();
        let dir = materialize(&self.work_root, "terraform", MAIN_FILE, code).await?;
        self.init(&dir).await?;

        let parallelism = parallelism_flag(input);
        let mut args = vec!["apply", "-auto-approve", "-input=false", "-no-color"];
        args.extend(parallelism.as_deref());
        run_cli(self.command(&dir, &args), APPLY_TIMEOUT, "terraform apply").await?;

        let resources = parse_state(&self.show(&dir, None).await?)?;
        let cmd = self.command(&dir, &["output", "-json"]);
        let stdout = run_cli(cmd, METADATA_TIMEOUT, "terraform output").await?;
        let outputs = parse_outputs(&parse_json("terraform output", &stdout)?);

        tracing::info!(
            resources = resources.len(),
            outputs = outputs.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "terraform apply finished"
        );
        Ok(ApplyOutcome {
            state: DeploymentState::new(resources, chrono::Utc::now()),
            outputs,
            destroy_target: dir.display().to_string(),
        })
    }

    async fn run_destroy(&self, dir: &Path) -> Result<(), ExecutorError> {
        let cmd = self.command(dir, &["destroy", "-auto-approve", "-input=false", "-no-color"]);
        run_cli(cmd, DESTROY_TIMEOUT, "terraform destroy").await?;
        tracing::info!("terraform destroy finished");
        Ok(())
    }
}

#[async_trait]
impl IacExecutor for TerraformExecutor {
    fn format(&self) -> IacFormat {
        IacFormat::Terraform
    }

    async fn plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let span = tracing::info_span!("terraform.plan", blueprint_id = %input.blueprint_id);
        self.run_plan(code, input).instrument(span).await
    }

    async fn apply(
        &self,
        code: &str,
        input: &DeploymentInput,
        _plan: &PlanResult,
    ) -> Result<ApplyOutcome, ExecutorError> {
        let span = tracing::info_span!("terraform.apply", blueprint_id = %input.blueprint_id);
        self.run_apply(code, input).instrument(span).await
    }

    async fn destroy(&self, target: &str) -> Result<(), ExecutorError> {
        let dir = Path::new(target);
        let span = tracing::info_span!("terraform.destroy", dir = %dir.display());
        self.run_destroy(dir).instrument(span).await
    }
}

const SHOW: &str = "terraform show";

/// Summarize `terraform show -json <planfile>`.
///
/// Resource changes whose only action is `no-op` or `read` are not counted.
/// An object without `resource_changes` is a plan with no changes.
pub(crate) fn parse_plan(show: Value) -> Result<PlanResult, ExecutorError> {
    expect_object(SHOW, &show)?;
    let mut changes = ChangeSummary::default();
    let mut resource_count = 0;
    for change in array_field(SHOW, &show, "resource_changes")? {
        let actions: Vec<&str> = change["change"]["actions"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();
        if actions.is_empty() || actions == ["no-op"] || actions == ["read"] {
            continue;
        }
        resource_count += 1;
        if actions.contains(&"create") {
            changes.add += 1;
        }
        if actions.contains(&"update") {
            changes.change += 1;
        }
        if actions.contains(&"delete") {
            changes.destroy += 1;
        }
    }
    Ok(PlanResult { resource_count, changes: Some(changes), raw: show })
}

/// Managed resources from `terraform show -json`, walking child modules.
///
/// A state without `values` (nothing applied yet) has no resources.
pub(crate) fn parse_state(show: &Value) -> Result<Vec<ResourceState>, ExecutorError> {
    expect_object(SHOW, show)?;
    let mut resources = Vec::new();
    if let Some(values) = object_field(SHOW, show, "values")? {
        if let Some(root) = object_field(SHOW, values, "root_module")? {
            collect_module(root, &mut resources)?;
        }
    }
    Ok(resources)
}

fn collect_module(module: &Value, out: &mut Vec<ResourceState>) -> Result<(), ExecutorError> {
    for resource in array_field(SHOW, module, "resources")? {
        if resource["mode"].as_str() == Some("data") {
            continue;
        }
        out.push(resource_from_state(resource));
    }
    for child in array_field(SHOW, module, "child_modules")? {
        collect_module(child, out)?;
    }
    Ok(())
}

fn resource_from_state(resource: &Value) -> ResourceState {
    let address = resource["address"].as_str().unwrap_or_default();
    let attributes: BTreeMap<String, Value> = resource["values"]
        .as_object()
        .map(|values| values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    ResourceState {
        id: resource["values"]["id"].as_str().unwrap_or(address).to_string(),
        resource_type: resource["type"].as_str().unwrap_or_default().to_string(),
        name: resource["name"].as_str().unwrap_or_default().to_string(),
        provider: provider_short_name(resource["provider_name"].as_str().unwrap_or_default()),
        attributes,
        dependencies: resource["depends_on"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        status: ResourceStatus::Created,
    }
}

/// `registry.terraform.io/hashicorp/aws` -> `aws`
fn provider_short_name(provider: &str) -> String {
    provider.rsplit('/').next().unwrap_or(provider).to_string()
}

/// Output values from `terraform output -json`.
pub(crate) fn parse_outputs(outputs: &Value) -> BTreeMap<String, Value> {
    outputs
        .as_object()
        .map(|map| map.iter().map(|(name, out)| (name.clone(), out["value"].clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "terraform_tests.rs"]
mod tests;
