// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CloudFormation backend, driven through `aws cloudformation`.
//!
//! Plans are change sets; applies use `deploy`. The destroy target is the
//! stack name, prefixed with `<region>/` when a region was requested.

use super::{array_field, expect_object, materialize, parse_json, run_cli, ExecutorError, IacExecutor};
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

const TEMPLATE_FILE: &str = "template.yaml";
const CAPABILITIES: [&str; 2] = ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

#[derive(Debug, Clone)]
pub struct CloudFormationExecutor {
    work_root: PathBuf,
    binary: PathBuf,
}

const CHANGE_SET: &str = "aws cloudformation describe-change-set";
const STACK_RESOURCES: &str = "aws cloudformation describe-stack-resources";

/// Stack name for `input`: `stratum-<blueprint>-<environment>`.
///
/// CloudFormation only accepts letters, digits and `-`, which also keeps
/// the `<region>/<name>` destroy target unambiguous.
pub fn stack_name(input: &DeploymentInput) -> Result<String, ExecutorError> {
    let name = format!("stratum-{}-{}", input.blueprint_id, input.environment);
    validate_stack_name(&name)?;
    Ok(name)
}

fn validate_stack_name(name: &str) -> Result<(), ExecutorError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ExecutorError::InvalidStackName(name.to_string()));
    }
    Ok(())
}

/// Map a CloudFormation resource status onto [`ResourceStatus`].
pub fn map_resource_status(status: &str) -> ResourceStatus {
    if status.contains("COMPLETE") {
        if status.starts_with("UPDATE") {
            ResourceStatus::Updated
        } else {
            ResourceStatus::Created
        }
    } else if status.contains("IN_PROGRESS") {
        ResourceStatus::Creating
    } else {
        ResourceStatus::Failed
    }
}

/// Stack location as encoded in a destroy target.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StackRef {
    region: Option<String>,
    name: String,
}

impl StackRef {
    fn for_input(input: &DeploymentInput) -> Result<Self, ExecutorError> {
        Ok(Self { region: input.options.region.clone(), name: stack_name(input)? })
    }

    fn parse(target: &str) -> Result<Self, ExecutorError> {
        let stack = match target.split_once('/') {
            Some((region, name)) => Self { region: Some(region.to_string()), name: name.to_string() },
            None => Self { region: None, name: target.to_string() },
        };
        validate_stack_name(&stack.name)?;
        Ok(stack)
    }

    fn target(&self) -> String {
        match &self.region {
            Some(region) => format!("{}/{}", region, self.name),
            None => self.name.clone(),
        }
    }
}

impl CloudFormationExecutor {
    pub fn new(work_root: &Path) -> Self {
        Self { work_root: work_root.to_path_buf(), binary: PathBuf::from("aws") }
    }

    /// Use a different `aws` binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self, stack: &StackRef, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("cloudformation").args(args).args(["--stack-name", stack.name.as_str()]);
        if let Some(region) = &stack.region {
            cmd.args(["--region", region.as_str()]);
        }
        cmd
    }

    /// `CREATE` for a new stack, `UPDATE` for an existing one.
    async fn change_set_type(&self, stack: &StackRef) -> Result<&'static str, ExecutorError> {
        let cmd = self.command(stack, &["describe-stacks", "--output", "json"]);
        match run_cli(cmd, METADATA_TIMEOUT, "aws cloudformation describe-stacks").await {
            Ok(_) => Ok("UPDATE"),
            Err(ExecutorError::CommandFailed { stderr, .. }) if stderr.contains("does not exist") => {
                Ok("CREATE")
            }
            Err(e) => Err(e),
        }
    }

    async fn run_plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let start = Instant::now();
        let dir = materialize(&self.work_root, "cloudformation", TEMPLATE_FILE, code).await?;
        let stack = StackRef::for_input(input)?;
        let change_set_type = self.change_set_type(&stack).await?;
        let change_set = format!("stratum-{}", uuid::Uuid::new_v4().simple());
        let template = format!("file://{}", dir.join(TEMPLATE_FILE).display());

        let mut args = vec![
            "create-change-set",
            "--change-set-name",
            change_set.as_str(),
            "--change-set-type",
            change_set_type,
            "--template-body",
            template.as_str(),
            "--capabilities",
        ];
        args.extend(CAPABILITIES);
        args.extend(["--output", "json"]);
        run_cli(self.command(&stack, &args), METADATA_TIMEOUT, "aws cloudformation create-change-set")
            .await?;

        let args = ["wait", "change-set-create-complete", "--change-set-name", change_set.as_str()];
        run_cli(self.command(&stack, &args), PLAN_TIMEOUT, "aws cloudformation wait").await?;

        let args = ["describe-change-set", "--change-set-name", change_set.as_str(), "--output", "json"];
        let stdout = run_cli(self.command(&stack, &args), METADATA_TIMEOUT, CHANGE_SET).await?;
        let plan = parse_change_set(parse_json(CHANGE_SET, &stdout)?)?;
        tracing::info!(
            stack = %stack.name,
            change_set_type,
            resource_count = plan.resource_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "cloudformation change set ready"
        );
        Ok(plan)
    }

    async fn run_apply(&self, code: &str, input: &DeploymentInput) -> Result<ApplyOutcome, ExecutorError> {
        let start = Instant::now();
        let dir = materialize(&self.work_root, "cloudformation", TEMPLATE_FILE, code).await?;
        let stack = StackRef::for_input(input)?;
        let template = dir.join(TEMPLATE_FILE).display().to_string();

        let mut args = vec!["deploy", "--template-file", template.as_str(), "--capabilities"];
        args.extend(CAPABILITIES);
        args.push("--no-fail-on-empty-changeset");
        run_cli(self.command(&stack, &args), APPLY_TIMEOUT, "aws cloudformation deploy").await?;

        let args = ["describe-stack-resources", "--output", "json"];
        let stdout = run_cli(self.command(&stack, &args), METADATA_TIMEOUT, STACK_RESOURCES).await?;
        let resources = parse_stack_resources(&parse_json(STACK_RESOURCES, &stdout)?)?;

        let args = ["describe-stacks", "--output", "json"];
        let stdout =
            run_cli(self.command(&stack, &args), METADATA_TIMEOUT, "aws cloudformation describe-stacks").await?;
        let outputs = parse_stack_outputs(&parse_json("aws cloudformation describe-stacks", &stdout)?);

        tracing::info!(
            stack = %stack.name,
            resources = resources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "cloudformation deploy finished"
        );
        Ok(ApplyOutcome {
            state: DeploymentState::new(resources, chrono::Utc::now()),
            outputs,
            destroy_target: stack.target(),
        })
    }

    async fn run_destroy(&self, stack: &StackRef) -> Result<(), ExecutorError> {
        run_cli(self.command(stack, &["delete-stack"]), METADATA_TIMEOUT, "aws cloudformation delete-stack")
            .await?;
        let args = ["wait", "stack-delete-complete"];
        run_cli(self.command(stack, &args), DESTROY_TIMEOUT, "aws cloudformation wait").await?;
        tracing::info!("stack deleted");
        Ok(())
    }
}

#[async_trait]
impl IacExecutor for CloudFormationExecutor {
    fn format(&self) -> IacFormat {
        IacFormat::CloudFormation
    }

    async fn plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let span = tracing::info_span!("cloudformation.plan", blueprint_id = %input.blueprint_id);
        self.run_plan(code, input).instrument(span).await
    }

    async fn apply(
        &self,
        code: &str,
        input: &DeploymentInput,
        _plan: &PlanResult,
    ) -> Result<ApplyOutcome, ExecutorError> {
        let span = tracing::info_span!("cloudformation.apply", blueprint_id = %input.blueprint_id);
        self.run_apply(code, input).instrument(span).await
    }

    async fn destroy(&self, target: &str) -> Result<(), ExecutorError> {
        let stack = StackRef::parse(target)?;
        let span = tracing::info_span!("cloudformation.destroy", stack = %stack.name);
        self.run_destroy(&stack).instrument(span).await
    }
}

/// Summarize `describe-change-set` output by resource action.
pub(crate) fn parse_change_set(change_set: Value) -> Result<PlanResult, ExecutorError> {
    expect_object(CHANGE_SET, &change_set)?;
    let mut changes = ChangeSummary::default();
    let mut resource_count = 0;
    for change in array_field(CHANGE_SET, &change_set, "Changes")? {
        match change["ResourceChange"]["Action"].as_str().unwrap_or_default() {
            "Add" => changes.add += 1,
            "Remove" => changes.destroy += 1,
            _ => changes.change += 1,
        }
        resource_count += 1;
    }
    Ok(PlanResult { resource_count, changes: Some(changes), raw: change_set })
}

/// Resources from `describe-stack-resources`.
pub(crate) fn parse_stack_resources(described: &Value) -> Result<Vec<ResourceState>, ExecutorError> {
    expect_object(STACK_RESOURCES, described)?;
    let resources = array_field(STACK_RESOURCES, described, "StackResources")?
        .iter()
        .map(|r| {
            let logical = r["LogicalResourceId"].as_str().unwrap_or_default();
            ResourceState {
                id: r["PhysicalResourceId"].as_str().unwrap_or(logical).to_string(),
                resource_type: r["ResourceType"].as_str().unwrap_or_default().to_string(),
                name: logical.to_string(),
                provider: "aws".to_string(),
                attributes: BTreeMap::new(),
                dependencies: Vec::new(),
                status: map_resource_status(r["ResourceStatus"].as_str().unwrap_or_default()),
            }
        })
        .collect();
    Ok(resources)
}

/// `Outputs` of the first stack in `describe-stacks`.
pub(crate) fn parse_stack_outputs(described: &Value) -> BTreeMap<String, Value> {
    described["Stacks"][0]["Outputs"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|o| Some((o["OutputKey"].as_str()?.to_string(), o["OutputValue"].clone())))
        .collect()
}

#[cfg(test)]
#[path = "cloudformation_tests.rs"]
mod tests;
