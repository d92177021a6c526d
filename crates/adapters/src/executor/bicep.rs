// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bicep backend, driven through `az deployment group`.

use super::{
    array_field, expect_object, materialize, object_field, parse_json, run_cli, ExecutorError,
    IacExecutor,
};
use crate::subprocess::{APPLY_TIMEOUT, DESTROY_TIMEOUT, PLAN_TIMEOUT};
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

const MAIN_FILE: &str = "main.bicep";
const WHAT_IF: &str = "az deployment group what-if";
const CREATE: &str = "az deployment group create";

/// Drives the Azure CLI. `destroy` expects a resource group name.
#[derive(Debug, Clone)]
pub struct BicepExecutor {
    work_root: PathBuf,
    binary: PathBuf,
}

/// Resource group for `input`: the requested one, else `<blueprint>-<environment>`.
pub fn resource_group(input: &DeploymentInput) -> String {
    input
        .options
        .resource_group
        .clone()
        .unwrap_or_else(|| format!("{}-{}", input.blueprint_id, input.environment))
}

impl BicepExecutor {
    pub fn new(work_root: &Path) -> Self {
        Self { work_root: work_root.to_path_buf(), binary: PathBuf::from("az") }
    }

    /// Use a different `az` binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self, dir: Option<&Path>, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn run_plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let start = Instant::now();
        let dir = materialize(&self.work_root, "bicep", MAIN_FILE, code).await?;
        let group = resource_group(input);
        let args = [
            "deployment",
            "group",
            "what-if",
            "--resource-group",
            group.as_str(),
            "--template-file",
            MAIN_FILE,
            "--no-pretty-print",
            "--output",
            "json",
        ];
        let cmd = self.command(Some(dir.as_path()), &args);
        let stdout = run_cli(cmd, PLAN_TIMEOUT, WHAT_IF).await?;
        let plan = parse_what_if(parse_json(WHAT_IF, &stdout)?)?;
        tracing::info!(
            resource_group = %group,
            resource_count = plan.resource_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "bicep what-if finished"
        );
        Ok(plan)
    }

    async fn run_apply(&self, code: &str, input: &DeploymentInput) -> Result<ApplyOutcome, ExecutorError> {
        let start = Instant::now();
        let dir = materialize(&self.work_root, "bicep", MAIN_FILE, code).await?;
        let group = resource_group(input);
        let name = format!("stratum-{}-{}", input.blueprint_id, input.environment);
        let args = [
            "deployment",
            "group",
            "create",
            "--resource-group",
            group.as_str(),
            "--name",
            name.as_str(),
            "--template-file",
            MAIN_FILE,
            "--output",
            "json",
        ];
        let cmd = self.command(Some(dir.as_path()), &args);
        let stdout = run_cli(cmd, APPLY_TIMEOUT, CREATE).await?;
        let deployment = parse_json(CREATE, &stdout)?;
        let resources = parse_output_resources(&deployment)?;
        let outputs = parse_outputs(&deployment);
        tracing::info!(
            resource_group = %group,
            resources = resources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "bicep deployment finished"
        );
        Ok(ApplyOutcome {
            state: DeploymentState::new(resources, chrono::Utc::now()),
            outputs,
            destroy_target: group,
        })
    }

    async fn run_destroy(&self, group: &str) -> Result<(), ExecutorError> {
        let cmd = self.command(None, &["group", "delete", "--name", group, "--yes"]);
        run_cli(cmd, DESTROY_TIMEOUT, "az group delete").await?;
        tracing::info!("resource group deleted");
        Ok(())
    }
}

#[async_trait]
impl IacExecutor for BicepExecutor {
    fn format(&self) -> IacFormat {
        IacFormat::Bicep
    }

    async fn plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let span = tracing::info_span!("bicep.plan", blueprint_id = %input.blueprint_id);
        self.run_plan(code, input).instrument(span).await
    }

    async fn apply(
        &self,
        code: &str,
        input: &DeploymentInput,
        _plan: &PlanResult,
    ) -> Result<ApplyOutcome, ExecutorError> {
        let span = tracing::info_span!("bicep.apply", blueprint_id = %input.blueprint_id);
        self.run_apply(code, input).instrument(span).await
    }

    async fn destroy(&self, target: &str) -> Result<(), ExecutorError> {
        let span = tracing::info_span!("bicep.destroy", resource_group = target);
        self.run_destroy(target).instrument(span).await
    }
}

/// Summarize `what-if` output; `NoChange` and `Ignore` entries are not counted.
pub(crate) fn parse_what_if(what_if: Value) -> Result<PlanResult, ExecutorError> {
    expect_object(WHAT_IF, &what_if)?;
    let mut changes = ChangeSummary::default();
    let mut resource_count = 0;
    for change in array_field(WHAT_IF, &what_if, "changes")? {
        match change["changeType"].as_str().unwrap_or_default() {
            "NoChange" | "Ignore" => continue,
            "Create" => changes.add += 1,
            "Delete" => changes.destroy += 1,
            _ => changes.change += 1,
        }
        resource_count += 1;
    }
    Ok(PlanResult { resource_count, changes: Some(changes), raw: what_if })
}

/// Resources from `properties.outputResources` of a completed deployment.
pub(crate) fn parse_output_resources(deployment: &Value) -> Result<Vec<ResourceState>, ExecutorError> {
    expect_object(CREATE, deployment)?;
    let Some(properties) = object_field(CREATE, deployment, "properties")? else {
        return Ok(Vec::new());
    };
    let resources = array_field(CREATE, properties, "outputResources")?
        .iter()
        .filter_map(|r| r["id"].as_str())
        .map(|id| {
            let (resource_type, name) = split_resource_id(id);
            ResourceState {
                id: id.to_string(),
                resource_type,
                name,
                provider: "azure".to_string(),
                attributes: BTreeMap::new(),
                dependencies: Vec::new(),
                status: ResourceStatus::Created,
            }
        })
        .collect();
    Ok(resources)
}

/// `.../providers/Microsoft.Web/sites/app/slots/stage` ->
/// (`Microsoft.Web/sites/slots`, `app/stage`)
fn split_resource_id(id: &str) -> (String, String) {
    let Some((_, tail)) = id.rsplit_once("/providers/") else {
        return (String::new(), id.rsplit('/').next().unwrap_or(id).to_string());
    };
    let mut segments = tail.split('/');
    let namespace = segments.next().unwrap_or_default();
    let mut types = vec![namespace];
    let mut names = Vec::new();
    while let (Some(ty), Some(name)) = (segments.next(), segments.next()) {
        types.push(ty);
        names.push(name);
    }
    (types.join("/"), names.join("/"))
}

/// Values from `properties.outputs` (`{name: {type, value}}`).
pub(crate) fn parse_outputs(deployment: &Value) -> BTreeMap<String, Value> {
    deployment["properties"]["outputs"]
        .as_object()
        .map(|map| map.iter().map(|(name, out)| (name.clone(), out["value"].clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "bicep_tests.rs"]
mod tests;
