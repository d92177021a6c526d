// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the external tools stratum drives: IaC CLIs and the
//! code-generation service.

pub mod codegen;
pub mod executor;
pub mod subprocess;

pub use codegen::{CodeSource, CodeSourceError, HttpCodeSource, DEFAULT_GENERATOR_URL};
pub use executor::{
    BicepExecutor, CloudFormationExecutor, ExecutorError, ExecutorRegistry, IacExecutor,
    TerraformExecutor,
};

#[cfg(any(test, feature = "test-support"))]
pub use codegen::FakeCodeSource;
#[cfg(any(test, feature = "test-support"))]
pub use executor::{ExecutorCall, FakeExecutor};
