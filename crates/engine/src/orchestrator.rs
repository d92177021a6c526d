// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment orchestrator.
//!
//! Owns every deployment record, drives each one through
//! plan -> (approval gate) -> apply on its own tokio task, and writes the
//! resulting infrastructure state through the [`StateStore`].
//!
//! Cancellation is cooperative: `cancel_deployment` removes the id from the
//! active set and fails the record, and the execution task checks the active
//! set between phases. Backend calls already in flight run to completion.

use crate::config::Config;
use crate::deployment_logger::DeploymentLogger;
use crate::error::OrchestratorError;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stratum_adapters::{CodeSource, CodeSourceError, ExecutorError, ExecutorRegistry, HttpCodeSource};
use stratum_core::{
    Clock, Deployment, DeploymentFilter, DeploymentId, DeploymentLog, DeploymentRequest,
    DeploymentStatus, LogLevel, RollbackRequest, SystemClock, TransitionError,
};
use stratum_storage::{StateError, StateStore};

/// Collaborators injected into an [`Orchestrator`].
pub struct OrchestratorDeps<C: Clock> {
    pub store: Arc<StateStore<C>>,
    pub executors: ExecutorRegistry,
    pub code_source: Arc<dyn CodeSource>,
    /// Mirrors deployment logs to files when set
    pub logger: Option<DeploymentLogger>,
}

struct Inner<C: Clock> {
    deployments: Mutex<IndexMap<DeploymentId, Deployment>>,
    /// Deployments whose execution task has not finished
    active: Mutex<IndexSet<DeploymentId>>,
    store: Arc<StateStore<C>>,
    executors: ExecutorRegistry,
    code_source: Arc<dyn CodeSource>,
    logger: Option<DeploymentLogger>,
    clock: C,
    drain_timeout: Duration,
    drain_poll_interval: Duration,
    shutting_down: AtomicBool,
}

/// Why an execution task stopped before completing.
enum Halt {
    /// The deployment was cancelled; its record is already settled
    Cancelled,
    Failed(String),
}

impl From<CodeSourceError> for Halt {
    fn from(e: CodeSourceError) -> Self {
        Halt::Failed(e.to_string())
    }
}

impl From<ExecutorError> for Halt {
    fn from(e: ExecutorError) -> Self {
        Halt::Failed(e.to_string())
    }
}

/// Drives deployments through their lifecycle.
///
/// Cheap to clone; clones share state.
pub struct Orchestrator<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for Orchestrator<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Orchestrator<SystemClock> {
    /// Build an orchestrator with the CLI backends and the HTTP code source
    /// described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, OrchestratorError> {
        let code_source = HttpCodeSource::new(&config.generator_url, config.fetch_timeout)?;
        let deps = OrchestratorDeps {
            store: Arc::new(StateStore::new(SystemClock)),
            executors: ExecutorRegistry::with_defaults(&config.work_dir),
            code_source: Arc::new(code_source),
            logger: config.log_dir.clone().map(DeploymentLogger::new),
        };
        Ok(Self::new(deps, SystemClock)
            .with_drain_timeout(config.drain_timeout)
            .with_drain_poll_interval(config.drain_poll_interval))
    }
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(deps: OrchestratorDeps<C>, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                deployments: Mutex::new(IndexMap::new()),
                active: Mutex::new(IndexSet::new()),
                store: deps.store,
                executors: deps.executors,
                code_source: deps.code_source,
                logger: deps.logger,
                clock,
                drain_timeout: crate::config::DEFAULT_DRAIN_TIMEOUT,
                drain_poll_interval: crate::config::DRAIN_POLL_INTERVAL,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Only valid before the orchestrator is shared.
    fn inner_mut(&mut self) -> Option<&mut Inner<C>> {
        Arc::get_mut(&mut self.inner)
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        if let Some(inner) = self.inner_mut() {
            inner.drain_timeout = timeout;
        }
        self
    }

    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        if let Some(inner) = self.inner_mut() {
            inner.drain_poll_interval = interval;
        }
        self
    }

    /// The state store deployments write through.
    pub fn state_store(&self) -> &Arc<StateStore<C>> {
        &self.inner.store
    }

    /// Validate `request`, record a `pending` deployment and start executing
    /// it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_deployment(&self, request: &DeploymentRequest) -> Result<Deployment, OrchestratorError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(OrchestratorError::ShuttingDown);
        }
        let input = request.validate()?;
        let deployment = Deployment::new(&input, self.inner.clock.utc_now());
        let id = deployment.id.clone();

        self.inner.deployments.lock().insert(id.clone(), deployment);
        self.inner.active.lock().insert(id.clone());
        tracing::info!(
            deployment_id = %id,
            blueprint_id = %input.blueprint_id,
            environment = %input.environment,
            format = %input.format,
            "deployment created"
        );

        let this = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move { this.execute(task_id).await });

        self.get_deployment(&id).ok_or(OrchestratorError::NotFound(id))
    }

    async fn execute(&self, id: DeploymentId) {
        let start = self.inner.clock.now();
        match self.run(&id).await {
            Ok(()) => {}
            Err(Halt::Cancelled) => {
                tracing::info!(deployment_id = %id, "execution stopped after cancellation");
            }
            Err(Halt::Failed(message)) => self.fail(&id, &message),
        }
        self.inner.active.lock().shift_remove(&id);

        let status = self.get_deployment(&id).map(|d| d.status);
        tracing::info!(
            deployment_id = %id,
            status = ?status,
            elapsed_ms = self.inner.clock.now().duration_since(start).as_millis() as u64,
            "deployment execution finished"
        );
    }

    async fn run(&self, id: &DeploymentId) -> Result<(), Halt> {
        let Some(deployment) = self.get_deployment(id) else {
            return Err(Halt::Cancelled);
        };
        let input = deployment.input();

        self.checkpoint(id)?;
        if !self.transition(id, DeploymentStatus::Planning) {
            return Err(Halt::Cancelled);
        }
        self.log(id, LogLevel::Info, "Starting deployment planning");

        let code = self.inner.code_source.fetch(&input.generation_job_id).await?;
        self.checkpoint(id)?;
        self.log(id, LogLevel::Info, "Retrieved generated IaC code");

        let executor = self.inner.executors.get(input.format).ok_or_else(|| {
            Halt::Failed(OrchestratorError::UnsupportedFormat(input.format).to_string())
        })?;

        self.log(id, LogLevel::Info, "Executing plan phase");
        let plan = executor.plan(&code, &input).await?;
        self.checkpoint(id)?;
        self.log(id, LogLevel::Info, format!("Plan completed: {} resources", plan.resource_count));

        if deployment.requires_approval() {
            self.log(id, LogLevel::Info, "Waiting for manual approval");
            tracing::info!(deployment_id = %id, "deployment parked at approval gate");
            return Ok(());
        }

        if input.options.dry_run {
            self.log(id, LogLevel::Info, "Dry run: skipping apply");
            if !self.complete(id, BTreeMap::new()) {
                return Err(Halt::Cancelled);
            }
            return Ok(());
        }

        if !self.transition(id, DeploymentStatus::Applying) {
            return Err(Halt::Cancelled);
        }
        self.log(id, LogLevel::Info, "Starting infrastructure deployment");

        let outcome = executor.apply(&code, &input, &plan).await?;

        // The infrastructure exists now, so the state is recorded even if
        // the deployment was cancelled while apply ran.
        let saved = self.inner.store.save_state(&deployment.state_key, outcome.state);
        let resource_count = saved.resources.len();
        self.update(id, |d| {
            d.state = Some(saved);
            d.destroy_target = Some(outcome.destroy_target);
        });
        self.log(id, LogLevel::Info, "State saved successfully");

        if !self.complete(id, outcome.outputs) {
            self.log(id, LogLevel::Warn, "Apply finished after cancellation; state recorded");
            return Err(Halt::Cancelled);
        }
        self.log(id, LogLevel::Info, "Deployment completed successfully");
        tracing::info!(deployment_id = %id, resource_count, "deployment completed");
        Ok(())
    }

    /// Stop if the deployment was cancelled while the task was suspended.
    fn checkpoint(&self, id: &DeploymentId) -> Result<(), Halt> {
        if self.is_active(id) {
            Ok(())
        } else {
            Err(Halt::Cancelled)
        }
    }

    fn update<R>(&self, id: &DeploymentId, f: impl FnOnce(&mut Deployment) -> R) -> Option<R> {
        self.inner.deployments.lock().get_mut(id).map(f)
    }

    /// Apply a status change; rejected changes are logged and ignored.
    fn transition(&self, id: &DeploymentId, next: DeploymentStatus) -> bool {
        let now = self.inner.clock.utc_now();
        match self.update(id, |d| d.transition(next, now)) {
            Some(Ok(())) => {
                tracing::info!(deployment_id = %id, status = %next, "status changed");
                true
            }
            Some(Err(e)) => {
                tracing::warn!(deployment_id = %id, error = %e, "status change rejected");
                false
            }
            None => false,
        }
    }

    /// Move to `completed` and attach `outputs` under one lock, so a
    /// concurrent cancel either wins outright or is refused.
    fn complete(&self, id: &DeploymentId, outputs: BTreeMap<String, serde_json::Value>) -> bool {
        let now = self.inner.clock.utc_now();
        let completed = self.update(id, |d| {
            d.transition(DeploymentStatus::Completed, now)?;
            d.outputs = outputs;
            Ok::<_, TransitionError>(())
        });
        match completed {
            Some(Ok(())) => {
                tracing::info!(deployment_id = %id, status = %DeploymentStatus::Completed, "status changed");
                true
            }
            Some(Err(e)) => {
                tracing::warn!(deployment_id = %id, error = %e, "completion rejected");
                false
            }
            None => false,
        }
    }

    fn fail(&self, id: &DeploymentId, message: &str) {
        let now = self.inner.clock.utc_now();
        match self.update(id, |d| d.fail(message, now)) {
            Some(Ok(())) => {
                self.log(id, LogLevel::Error, format!("Deployment failed: {}", message));
                tracing::warn!(deployment_id = %id, error = message, "deployment failed");
            }
            Some(Err(e)) => {
                tracing::warn!(
                    deployment_id = %id,
                    error = message,
                    rejected = %e,
                    "failure after deployment settled"
                );
            }
            None => {}
        }
    }

    fn log(&self, id: &DeploymentId, level: LogLevel, message: impl Into<String>) {
        self.log_resource(id, level, message, None);
    }

    fn log_resource(
        &self,
        id: &DeploymentId,
        level: LogLevel,
        message: impl Into<String>,
        resource: Option<String>,
    ) {
        let now = self.inner.clock.utc_now();
        let message = message.into();
        let entry = self.update(id, |d| {
            d.push_log(level, message, resource, now);
            d.logs.last().cloned()
        });
        if let (Some(logger), Some(Some(entry))) = (&self.inner.logger, entry) {
            logger.append(id.as_str(), &entry);
        }
    }

    /// Cancel an active deployment.
    ///
    /// Returns `false` for unknown or already finished deployments.
    pub fn cancel_deployment(&self, id: &DeploymentId) -> bool {
        if !self.inner.active.lock().shift_remove(id) {
            return false;
        }
        let now = self.inner.clock.utc_now();
        match self.update(id, |d| d.fail("Cancelled by user", now)) {
            Some(Ok(())) => {
                self.log(id, LogLevel::Info, "Deployment cancelled");
                tracing::info!(deployment_id = %id, "deployment cancelled");
                true
            }
            Some(Err(e)) => {
                tracing::warn!(deployment_id = %id, error = %e, "cancel raced with completion");
                false
            }
            None => false,
        }
    }

    /// Restore a recorded state version as a new deployment.
    ///
    /// The restored state is written as the next version of the original's
    /// state lineage. A missing version fails the new deployment and leaves
    /// the original untouched.
    pub fn rollback(&self, request: &RollbackRequest) -> Result<Deployment, OrchestratorError> {
        let original = self
            .get_deployment(&request.deployment_id)
            .ok_or_else(|| OrchestratorError::NotFound(request.deployment_id.clone()))?;
        tracing::info!(
            deployment_id = %original.id,
            target_version = ?request.target_version,
            reason = %request.reason,
            "starting rollback"
        );

        let rollback = Deployment::rollback_of(&original, self.inner.clock.utc_now());
        let id = rollback.id.clone();
        self.inner.deployments.lock().insert(id.clone(), rollback);
        self.log(&id, LogLevel::Info, format!("Rollback initiated: {}", request.reason));

        let store = &self.inner.store;
        match store.get_state_version(&original.state_key, request.target_version) {
            None => {
                let message = match request.target_version {
                    Some(version) => {
                        format!("no state version {} for deployment {}", version, original.id)
                    }
                    None => format!("no state for deployment {}", original.id),
                };
                self.fail(&id, &message);
                tracing::warn!(deployment_id = %id, error = %message, "rollback failed");
            }
            Some(target) => {
                let restored_from = target.version;
                let saved = store.save_state(&original.state_key, target);
                let version = saved.version;
                self.update(&id, |d| d.state = Some(saved));
                self.log(
                    &id,
                    LogLevel::Info,
                    format!("Restored state version {} as version {}", restored_from, version),
                );
                self.transition(&id, DeploymentStatus::Completed);

                if self.transition(&original.id, DeploymentStatus::RolledBack) {
                    self.log(&original.id, LogLevel::Info, format!("Rolled back by {}", id));
                }
                tracing::info!(deployment_id = %id, version, "rollback completed");
            }
        }

        self.get_deployment(&id).ok_or(OrchestratorError::NotFound(id))
    }

    /// Tear down the infrastructure a deployment recorded and delete its
    /// state lineage.
    pub async fn destroy_deployment(&self, id: &DeploymentId) -> Result<(), OrchestratorError> {
        let deployment =
            self.get_deployment(id).ok_or_else(|| OrchestratorError::NotFound(id.clone()))?;
        if self.is_active(id) {
            return Err(OrchestratorError::Busy(id.clone()));
        }
        let target = deployment
            .destroy_target
            .clone()
            .ok_or_else(|| OrchestratorError::NothingToDestroy(id.clone()))?;
        let executor = self
            .inner
            .executors
            .get(deployment.format)
            .ok_or(OrchestratorError::UnsupportedFormat(deployment.format))?;

        let store = &self.inner.store;
        let lock = match store.lock_state(&deployment.state_key, "destroy", "stratum") {
            Ok(lock) => Some(lock),
            Err(StateError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        self.log_resource(id, LogLevel::Info, "Destroying infrastructure", Some(target.clone()));
        if let Err(e) = executor.destroy(&target).await {
            if let Some(lock) = lock {
                if let Err(unlock) = store.unlock_state(&deployment.state_key, lock.as_str()) {
                    tracing::warn!(deployment_id = %id, error = %unlock, "failed to release destroy lock");
                }
            }
            self.log(id, LogLevel::Error, format!("Destroy failed: {}", e));
            return Err(e.into());
        }

        store.delete_state(&deployment.state_key);
        self.log(id, LogLevel::Info, "Infrastructure destroyed");
        tracing::info!(deployment_id = %id, target = %target, "infrastructure destroyed");
        Ok(())
    }

    pub fn get_deployment(&self, id: &DeploymentId) -> Option<Deployment> {
        self.inner.deployments.lock().get(id).cloned()
    }

    /// Deployments matching `filter`, newest first, at most `filter.limit`.
    pub fn list_deployments(&self, filter: &DeploymentFilter) -> Vec<Deployment> {
        let mut matches: Vec<Deployment> = self
            .inner
            .deployments
            .lock()
            .values()
            .rev()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        // stable: equal timestamps keep newest-inserted first
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(filter.limit);
        matches
    }

    pub fn get_deployment_logs(&self, id: &DeploymentId) -> Option<Vec<DeploymentLog>> {
        self.inner.deployments.lock().get(id).map(|d| d.logs.clone())
    }

    /// Ids of deployments still executing, in start order.
    pub fn active_deployments(&self) -> Vec<DeploymentId> {
        self.inner.active.lock().iter().cloned().collect()
    }

    pub fn is_active(&self, id: &DeploymentId) -> bool {
        self.inner.active.lock().contains(id)
    }

    /// Stop accepting deployments and wait for active ones to finish.
    ///
    /// Polls until the active set is empty or the drain timeout passes.
    /// Returns the ids abandoned still running.
    pub async fn shutdown(&self) -> Vec<DeploymentId> {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        let active = self.inner.active.lock().len();
        tracing::info!(active_deployments = active, "shutting down orchestrator");

        let start = tokio::time::Instant::now();
        loop {
            let remaining = self.active_deployments();
            if remaining.is_empty() {
                tracing::info!("orchestrator drained");
                return remaining;
            }
            if start.elapsed() >= self.inner.drain_timeout {
                tracing::warn!(count = remaining.len(), "Shutdown with active deployments");
                return remaining;
            }
            tokio::time::sleep(self.inner.drain_poll_interval).await;
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
