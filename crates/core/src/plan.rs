// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Results exchanged between the orchestrator and executor backends.

use crate::state::DeploymentState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts of planned changes, where the backend reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub add: usize,
    pub change: usize,
    pub destroy: usize,
}

/// Output of a backend's "what would change" operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    /// Number of resources the plan touches
    pub resource_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSummary>,
    /// Raw backend output
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl PlanResult {
    pub fn new(resource_count: usize) -> Self {
        Self { resource_count, changes: None, raw: serde_json::Value::Null }
    }
}

/// Output of a successful apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// Unsaved state describing the deployed resources
    pub state: DeploymentState,
    pub outputs: BTreeMap<String, serde_json::Value>,
    /// Identifier the backend's `destroy` expects for this infrastructure
    pub destroy_target: String,
}
