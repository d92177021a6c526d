// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory executor for tests.

use super::{ExecutorError, IacExecutor};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use stratum_core::{
    ApplyOutcome, DeploymentInput, DeploymentState, IacFormat, PlanResult, ResourceState,
    ResourceStatus,
};
use tokio::sync::{watch, Notify};

/// Recorded executor call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorCall {
    Plan { blueprint_id: String, code: String },
    Apply { blueprint_id: String, code: String },
    Destroy { target: String },
}

struct FakeExecutorState {
    resources: Vec<ResourceState>,
    outputs: BTreeMap<String, Value>,
    plan_error: Option<String>,
    apply_error: Option<String>,
    destroy_error: Option<String>,
    hold_plan: bool,
    hold_apply: bool,
    calls: Vec<ExecutorCall>,
}

/// Fake executor with scripted results.
///
/// Plans report one change per configured resource; applies return those
/// resources as a fresh state. `hold_plan` / `hold_apply` park calls until
/// [`FakeExecutor::release`].
#[derive(Clone)]
pub struct FakeExecutor {
    format: IacFormat,
    inner: Arc<Mutex<FakeExecutorState>>,
    entered: Arc<Notify>,
    released: Arc<watch::Sender<bool>>,
}

impl FakeExecutor {
    /// A backend for `format` that deploys two resources.
    pub fn new(format: IacFormat) -> Self {
        let resources = (0..2)
            .map(|i| ResourceState {
                id: format!("res-{}", i),
                resource_type: "fake_resource".to_string(),
                name: format!("r{}", i),
                provider: "fake".to_string(),
                attributes: BTreeMap::new(),
                dependencies: Vec::new(),
                status: ResourceStatus::Created,
            })
            .collect();
        let (released, _) = watch::channel(false);
        Self {
            format,
            inner: Arc::new(Mutex::new(FakeExecutorState {
                resources,
                outputs: BTreeMap::new(),
                plan_error: None,
                apply_error: None,
                destroy_error: None,
                hold_plan: false,
                hold_apply: false,
                calls: Vec::new(),
            })),
            entered: Arc::new(Notify::new()),
            released: Arc::new(released),
        }
    }

    pub fn with_resources(self, resources: Vec<ResourceState>) -> Self {
        self.inner.lock().resources = resources;
        self
    }

    pub fn with_output(self, name: &str, value: Value) -> Self {
        self.inner.lock().outputs.insert(name.to_string(), value);
        self
    }

    pub fn fail_plan(&self, message: &str) {
        self.inner.lock().plan_error = Some(message.to_string());
    }

    pub fn fail_apply(&self, message: &str) {
        self.inner.lock().apply_error = Some(message.to_string());
    }

    pub fn fail_destroy(&self, message: &str) {
        self.inner.lock().destroy_error = Some(message.to_string());
    }

    /// Park `plan` calls until [`FakeExecutor::release`].
    pub fn hold_plan(&self) {
        self.inner.lock().hold_plan = true;
    }

    /// Park `apply` calls until [`FakeExecutor::release`].
    pub fn hold_apply(&self) {
        self.inner.lock().hold_apply = true;
    }

    /// Let parked and future calls proceed.
    pub fn release(&self) {
        self.released.send_replace(true);
    }

    /// Resolves once a held call has started waiting.
    pub async fn wait_until_held(&self) {
        self.entered.notified().await;
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.inner.lock().calls.clone()
    }

    async fn park(&self) {
        self.entered.notify_one();
        let mut released = self.released.subscribe();
        let _ = released.wait_for(|released| *released).await;
    }
}

#[async_trait]
impl IacExecutor for FakeExecutor {
    fn format(&self) -> IacFormat {
        self.format
    }

    async fn plan(&self, code: &str, input: &DeploymentInput) -> Result<PlanResult, ExecutorError> {
        let hold = {
            let mut inner = self.inner.lock();
            inner.calls.push(ExecutorCall::Plan {
                blueprint_id: input.blueprint_id.clone(),
                code: code.to_string(),
            });
            inner.hold_plan
        };
        if hold {
            self.park().await;
        }
        let inner = self.inner.lock();
        if let Some(message) = &inner.plan_error {
            return Err(ExecutorError::Spawn(message.clone()));
        }
        Ok(PlanResult::new(inner.resources.len()))
    }

    async fn apply(
        &self,
        code: &str,
        input: &DeploymentInput,
        _plan: &PlanResult,
    ) -> Result<ApplyOutcome, ExecutorError> {
        let hold = {
            let mut inner = self.inner.lock();
            inner.calls.push(ExecutorCall::Apply {
                blueprint_id: input.blueprint_id.clone(),
                code: code.to_string(),
            });
            inner.hold_apply
        };
        if hold {
            self.park().await;
        }
        let inner = self.inner.lock();
        if let Some(message) = &inner.apply_error {
            return Err(ExecutorError::Spawn(message.clone()));
        }
        Ok(ApplyOutcome {
            state: DeploymentState::new(inner.resources.clone(), chrono::Utc::now()),
            outputs: inner.outputs.clone(),
            destroy_target: format!("fake-{}-{}", input.blueprint_id, input.environment),
        })
    }

    async fn destroy(&self, target: &str) -> Result<(), ExecutorError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ExecutorCall::Destroy { target: target.to_string() });
        match &inner.destroy_error {
            Some(message) => Err(ExecutorError::Spawn(message.clone())),
            None => Ok(()),
        }
    }
}
