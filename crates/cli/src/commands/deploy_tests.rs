// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;
use stratum_core::{Environment, IacFormat};

#[derive(Parser)]
struct Harness {
    #[command(flatten)]
    args: DeployArgs,
}

fn parse(extra: &[&str]) -> DeployArgs {
    let mut argv = vec![
        "deploy",
        "--blueprint",
        "bp1",
        "--generation-job",
        "job1",
        "--environment",
        "staging",
        "--cloud",
        "aws",
        "--format",
        "cloudformation",
    ];
    argv.extend_from_slice(extra);
    Harness::try_parse_from(argv).unwrap().args
}

#[test]
fn flags_become_a_valid_request() {
    let args = parse(&["--region", "eu-west-1", "--dry-run", "--parallelism", "4"]);
    let input = args.to_request().validate().unwrap();

    assert_eq!(input.blueprint_id, "bp1");
    assert_eq!(input.generation_job_id, "job1");
    assert_eq!(input.environment, Environment::Staging);
    assert_eq!(input.format, IacFormat::CloudFormation);
    assert!(input.options.dry_run);
    assert!(!input.options.auto_approve);
    assert_eq!(input.options.parallelism, Some(4));
    assert_eq!(input.options.region.as_deref(), Some("eu-west-1"));
}

#[test]
fn unknown_values_reach_validation() {
    let mut args = parse(&[]);
    args.environment = "qa".into();
    let err = args.to_request().validate().unwrap_err();
    assert!(err.to_string().starts_with("invalid environment:"), "{err}");
}

#[test]
fn missing_required_flag_is_a_usage_error() {
    assert!(Harness::try_parse_from(["deploy", "--blueprint", "bp1"]).is_err());
}
