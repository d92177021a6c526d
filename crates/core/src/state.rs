// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Infrastructure state records: resources, versioned states, backups, locks.

use crate::id::{DeploymentId, LockId, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of one managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
    Failed,
}

crate::wire_enum! {
    ResourceStatus {
        Creating => "creating",
        Created => "created",
        Updating => "updating",
        Updated => "updated",
        Deleting => "deleting",
        Deleted => "deleted",
        Failed => "failed",
    }
}

/// One managed infrastructure object, as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Provider-assigned identifier
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Ids of resources this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub status: ResourceStatus,
}

crate::builder! {
    pub struct ResourceStateBuilder => ResourceState {
        into {
            id: String = "res-1",
            resource_type: String = "aws_instance",
            name: String = "web",
            provider: String = "aws",
        }
        set {
            dependencies: Vec<String> = Vec::new(),
            status: ResourceStatus = ResourceStatus::Created,
        }
        computed {
            attributes: BTreeMap<String, serde_json::Value> = BTreeMap::new(),
        }
    }
}

/// Holder of an advisory lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: LockId,
    /// Caller-supplied label for the operation holding the lock
    pub operation: String,
    /// Caller-supplied identity
    pub who: String,
    pub created: DateTime<Utc>,
}

/// The current infrastructure record for one deployment lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    pub state_id: StateId,
    /// Assigned by the state store on write; 0 until first saved
    pub version: u64,
    pub resources: Vec<ResourceState>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_info: Option<LockInfo>,
}

impl DeploymentState {
    /// A fresh, unsaved state for the given resources.
    pub fn new(resources: Vec<ResourceState>, at: DateTime<Utc>) -> Self {
        Self {
            state_id: StateId::new(),
            version: 0,
            resources,
            last_modified: at,
            locked: false,
            lock_info: None,
        }
    }
}

/// Immutable point-in-time copy of a superseded `DeploymentState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBackup {
    pub deployment_id: DeploymentId,
    pub version: u64,
    pub state: DeploymentState,
    pub created_at: DateTime<Utc>,
}
