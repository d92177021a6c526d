// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help and version output.

use crate::prelude::*;

#[test]
fn no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn help_lists_commands() {
    cli().args(&["--help"]).passes().stdout_has("deploy").stdout_has("state");
}

#[test]
fn deploy_help_lists_flags() {
    cli()
        .args(&["deploy", "--help"])
        .passes()
        .stdout_has("--generation-job")
        .stdout_has("--auto-approve")
        .stdout_has("--dry-run");
}

#[test]
fn state_help_lists_subcommands() {
    cli()
        .args(&["state", "--help"])
        .passes()
        .stdout_has("show")
        .stdout_has("history")
        .stdout_has("lock")
        .stdout_has("unlock")
        .stdout_has("delete");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
