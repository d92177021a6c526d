// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{DeploymentRequest, DeploymentState, ResourceState};
use chrono::{DateTime, Utc};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::deployment::DeploymentStatus;
    use proptest::prelude::*;

    pub fn arb_deployment_status() -> impl Strategy<Value = DeploymentStatus> {
        proptest::sample::select(DeploymentStatus::ALL.to_vec())
    }
}

// ── Factories ───────────────────────────────────────────────────────────

/// A valid request for blueprint `bp1` / job `job1`.
pub fn request(environment: &str, format: &str) -> DeploymentRequest {
    let cloud = match format {
        "bicep" => "azure",
        _ => "aws",
    };
    DeploymentRequest::new("bp1", "job1", environment, cloud, format)
}

/// `count` distinct resources named `r0..r{count}`.
pub fn resources(count: usize) -> Vec<ResourceState> {
    (0..count)
        .map(|i| ResourceState::builder().id(format!("res-{i}")).name(format!("r{i}")).build())
        .collect()
}

/// An unsaved state holding `count` resources.
pub fn state_with(count: usize, at: DateTime<Utc>) -> DeploymentState {
    DeploymentState::new(resources(count), at)
}
