// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Deployment orchestration engine for stratum

pub mod config;
mod deployment_logger;
pub mod env;
mod error;
mod orchestrator;

pub use config::{Config, ConfigError};
pub use deployment_logger::{deployment_log_path, DeploymentLogger};
pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, OrchestratorDeps};
