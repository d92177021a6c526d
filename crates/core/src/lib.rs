// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-core: data model and lifecycle rules for the deployment orchestrator

pub mod macros;

pub mod clock;
pub mod deployment;
pub mod id;
pub mod plan;
pub mod request;
pub mod state;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use deployment::{
    Deployment, DeploymentLog, DeploymentStatus, Environment, IacFormat, LogLevel, TargetCloud,
    TransitionError,
};
pub use id::{DeploymentId, LockId, StateId};
pub use plan::{ApplyOutcome, ChangeSummary, PlanResult};
pub use request::{
    DeploymentFilter, DeploymentInput, DeploymentOptions, DeploymentRequest, RollbackRequest,
    UnknownVariant, ValidationError, DEFAULT_LIST_LIMIT,
};
#[cfg(any(test, feature = "test-support"))]
pub use state::ResourceStateBuilder;
pub use state::{DeploymentState, LockInfo, ResourceState, ResourceStatus, StateBackup};
pub use time_fmt::{format_elapsed, format_elapsed_ms, format_utc};
