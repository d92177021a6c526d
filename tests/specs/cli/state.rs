// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `stratum state` against snapshot files.

use crate::prelude::*;

#[test]
fn state_commands_need_a_state_file() {
    cli().args(&["state", "list"]).exits_with(2).stderr_has("--state-file");
}

#[test]
fn missing_snapshot_is_an_empty_store() {
    let ws = Workspace::new();
    ws.stratum().args(&["state", "list"]).passes();
    ws.stratum().args(&["state", "history", "dep-a"]).passes().stdout_has("No backups");
    assert!(!ws.state_file().exists());
}

#[test]
fn show_of_unknown_deployment_fails() {
    let ws = Workspace::new();
    ws.stratum().args(&["state", "show", "dep-a"]).exits_with(1).stderr_has("no state for dep-a");
}

#[test]
fn lock_of_unknown_deployment_fails() {
    let ws = Workspace::new();
    ws.stratum()
        .args(&["state", "lock", "dep-a", "--operation", "apply", "--who", "alice"])
        .exits_with(1)
        .stderr_has("no state for deployment dep-a");
}

#[test]
fn json_output_for_empty_list() {
    let ws = Workspace::new();
    let run = ws.stratum().args(&["-o", "json", "state", "list"]).passes();
    let value: serde_json::Value = serde_json::from_str(&run.stdout()).unwrap();
    assert_eq!(value, serde_json::json!([]));
}

#[test]
fn corrupt_snapshot_is_reported() {
    let ws = Workspace::new();
    std::fs::write(ws.state_file(), b"not zstd").unwrap();
    ws.stratum().args(&["state", "list"]).exits_with(1).stderr_has("error:");
}
