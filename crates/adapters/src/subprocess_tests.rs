// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[tokio::test]
async fn captures_stdout_and_status() {
    let output = run_with_timeout(sh("echo hello"), Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn nonzero_exit_is_returned_not_raised() {
    let output =
        run_with_timeout(sh("echo oops >&2; exit 3"), Duration::from_secs(5), "fail").await.unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
}

#[tokio::test]
async fn timeout_reports_description() {
    let err = run_with_timeout(sh("sleep 5"), Duration::from_millis(50), "terraform plan")
        .await
        .unwrap_err();
    assert_eq!(err, "terraform plan timed out after 0s");
}

#[tokio::test]
async fn missing_binary_fails_to_start() {
    let cmd = Command::new("/nonexistent/stratum-test-binary");
    let err = run_with_timeout(cmd, Duration::from_secs(5), "missing").await.unwrap_err();
    assert!(err.starts_with("missing failed to start:"), "{err}");
}
