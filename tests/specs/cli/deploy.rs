// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `stratum deploy` request validation.

use crate::prelude::*;

fn deploy_args<'a>(environment: &'a str, format: &'a str) -> Vec<&'a str> {
    vec![
        "deploy",
        "--blueprint",
        "bp1",
        "--generation-job",
        "job1",
        "--environment",
        environment,
        "--cloud",
        "aws",
        "--format",
        format,
    ]
}

#[test]
fn invalid_environment_exits_two() {
    let ws = Workspace::new();
    ws.stratum()
        .args(&deploy_args("qa", "terraform"))
        .exits_with(2)
        .stderr_has("invalid environment");
    assert!(!ws.state_file().exists());
}

#[test]
fn unknown_format_exits_two() {
    let ws = Workspace::new();
    ws.stratum().args(&deploy_args("dev", "pulumi")).exits_with(2).stderr_has("invalid format");
}

#[test]
fn blank_blueprint_exits_two() {
    let ws = Workspace::new();
    let mut args = deploy_args("dev", "terraform");
    args[2] = " ";
    ws.stratum().args(&args).exits_with(2).stderr_has("blueprintId is required");
}

#[test]
fn invalid_generator_url_is_a_config_error() {
    let ws = Workspace::new();
    ws.stratum()
        .env("STRATUM_GENERATOR_URL", "ftp://nowhere")
        .args(&deploy_args("dev", "terraform"))
        .exits_with(1)
        .stderr_has("invalid config");
}
