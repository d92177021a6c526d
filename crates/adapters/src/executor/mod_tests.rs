// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use stratum_core::test_support::request;

#[test]
fn defaults_cover_every_format() {
    let registry = ExecutorRegistry::with_defaults(Path::new("/tmp/stratum-work"));
    assert_eq!(registry.formats(), IacFormat::ALL.to_vec());
    for format in IacFormat::ALL {
        assert_eq!(registry.get(*format).map(|e| e.format()), Some(*format));
    }
}

#[test]
fn empty_registry_has_no_backends() {
    let registry = ExecutorRegistry::new();
    assert!(registry.get(IacFormat::Terraform).is_none());
    assert!(registry.formats().is_empty());
    assert_eq!(format!("{:?}", registry), "ExecutorRegistry { formats: [] }");
}

#[tokio::test]
async fn register_replaces_existing_backend() {
    let mut registry = ExecutorRegistry::with_defaults(Path::new("/tmp/stratum-work"));
    let fake = FakeExecutor::new(IacFormat::Bicep);
    registry.register(fake.clone());
    assert_eq!(registry.formats().len(), 3);

    let backend = registry.get(IacFormat::Bicep).unwrap();
    let input = request("dev", "bicep").validate().unwrap();
    let plan = backend.plan("code", &input).await.unwrap();
    assert_eq!(plan.resource_count, 2);
    assert_eq!(
        fake.calls(),
        vec![ExecutorCall::Plan { blueprint_id: "bp1".into(), code: "code".into() }]
    );
}

#[tokio::test]
async fn run_cli_maps_exit_status() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo out; echo 'bad thing' >&2; exit 4");
    let err = run_cli(cmd, Duration::from_secs(5), "sh check").await.unwrap_err();
    assert_eq!(err.to_string(), "sh check failed (exit 4): bad thing");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo '{\"ok\": true}'");
    let stdout = run_cli(cmd, Duration::from_secs(5), "sh check").await.unwrap();
    assert_eq!(parse_json("sh check", &stdout).unwrap()["ok"], true);
}

#[test]
fn parse_json_names_the_command() {
    let err = parse_json("terraform show", "not json").unwrap_err();
    assert!(err.to_string().starts_with("could not parse terraform show output:"), "{err}");
}

#[tokio::test]
async fn fake_holds_until_released() {
    let fake = FakeExecutor::new(IacFormat::Terraform);
    fake.hold_apply();
    let input = request("dev", "terraform").validate().unwrap();

    let task = {
        let fake = fake.clone();
        let input = input.clone();
        tokio::spawn(async move { fake.apply("code", &input, &PlanResult::new(2)).await })
    };
    fake.wait_until_held().await;
    assert!(!task.is_finished());
    fake.release();

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.state.resources.len(), 2);
    assert_eq!(outcome.destroy_target, "fake-bp1-dev");
}

#[tokio::test]
async fn fake_scripted_failures() {
    let fake = FakeExecutor::new(IacFormat::Terraform);
    fake.fail_plan("plan exploded");
    fake.fail_destroy("destroy exploded");
    let input = request("dev", "terraform").validate().unwrap();

    assert_eq!(fake.plan("", &input).await.unwrap_err().to_string(), "plan exploded");
    assert_eq!(fake.destroy("t").await.unwrap_err().to_string(), "destroy exploded");
    assert_eq!(fake.calls().len(), 2);
}
