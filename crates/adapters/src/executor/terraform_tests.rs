// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use stratum_core::test_support::request;
use yare::parameterized;

fn plan_show(actions: &[&[&str]]) -> Value {
    let changes: Vec<Value> = actions
        .iter()
        .enumerate()
        .map(|(i, a)| json!({"address": format!("aws_instance.r{i}"), "change": {"actions": a}}))
        .collect();
    json!({"format_version": "1.2", "resource_changes": changes})
}

#[test]
fn plan_counts_changed_resources() {
    let plan = parse_plan(plan_show(&[&["create"], &["create"], &["no-op"]])).unwrap();
    assert_eq!(plan.resource_count, 2);
    assert_eq!(plan.changes, Some(ChangeSummary { add: 2, change: 0, destroy: 0 }));
    assert_eq!(plan.raw["format_version"], "1.2");
}

#[parameterized(
    create = { &["create"], (1, 0, 0) },
    update = { &["update"], (0, 1, 0) },
    delete = { &["delete"], (0, 0, 1) },
    replace = { &["delete", "create"], (1, 0, 1) },
    create_before_destroy = { &["create", "delete"], (1, 0, 1) },
)]
fn plan_action_classification(actions: &[&str], expected: (usize, usize, usize)) {
    let plan = parse_plan(plan_show(&[actions])).unwrap();
    assert_eq!(plan.resource_count, 1);
    let changes = plan.changes.unwrap();
    assert_eq!((changes.add, changes.change, changes.destroy), expected);
}

#[test]
fn plan_without_changes_is_empty() {
    assert_eq!(parse_plan(json!({})).unwrap().resource_count, 0);
    assert_eq!(parse_plan(plan_show(&[&["read"], &["no-op"]])).unwrap().resource_count, 0);
}

#[parameterized(
    changes_not_an_array = { json!({"resource_changes": "not-an-array"}) },
    top_level_array = { json!([1, 2, 3]) },
    top_level_string = { json!("plan") },
)]
fn malformed_plan_is_rejected(show: Value) {
    let err = parse_plan(show).unwrap_err();
    assert!(matches!(err, ExecutorError::Unexpected { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("unexpected terraform show output"));
}

fn state_show() -> Value {
    json!({
        "values": {
            "root_module": {
                "resources": [
                    {
                        "address": "aws_vpc.main",
                        "mode": "managed",
                        "type": "aws_vpc",
                        "name": "main",
                        "provider_name": "registry.terraform.io/hashicorp/aws",
                        "values": {"id": "vpc-123", "cidr_block": "10.0.0.0/16"}
                    },
                    {
                        "address": "data.aws_ami.ubuntu",
                        "mode": "data",
                        "type": "aws_ami",
                        "name": "ubuntu",
                        "provider_name": "registry.terraform.io/hashicorp/aws",
                        "values": {"id": "ami-1"}
                    }
                ],
                "child_modules": [{
                    "address": "module.web",
                    "resources": [{
                        "address": "module.web.aws_instance.app",
                        "mode": "managed",
                        "type": "aws_instance",
                        "name": "app",
                        "provider_name": "registry.terraform.io/hashicorp/aws",
                        "values": {"instance_type": "t3.micro"},
                        "depends_on": ["aws_vpc.main"]
                    }]
                }]
            }
        }
    })
}

#[test]
fn state_walks_child_modules_and_skips_data_sources() {
    let resources = parse_state(&state_show()).unwrap();
    assert_eq!(resources.len(), 2);

    let vpc = &resources[0];
    assert_eq!(vpc.id, "vpc-123");
    assert_eq!(vpc.resource_type, "aws_vpc");
    assert_eq!(vpc.name, "main");
    assert_eq!(vpc.provider, "aws");
    assert_eq!(vpc.attributes["cidr_block"], "10.0.0.0/16");
    assert_eq!(vpc.status, ResourceStatus::Created);

    let app = &resources[1];
    assert_eq!(app.id, "module.web.aws_instance.app", "falls back to address without an id");
    assert_eq!(app.dependencies, vec!["aws_vpc.main".to_string()]);
}

#[test]
fn empty_state_has_no_resources() {
    assert!(parse_state(&json!({"format_version": "1.0"})).unwrap().is_empty());
}

#[parameterized(
    values_not_an_object = { json!({"values": "garbage"}) },
    root_module_not_an_object = { json!({"values": {"root_module": []}}) },
    resources_not_an_array = { json!({"values": {"root_module": {"resources": 7}}}) },
    top_level_array = { json!([]) },
)]
fn malformed_state_is_rejected(show: Value) {
    let err = parse_state(&show).unwrap_err();
    assert!(matches!(err, ExecutorError::Unexpected { .. }), "got {err:?}");
}

#[test]
fn outputs_unwrap_values() {
    let outputs = parse_outputs(&json!({
        "url": {"value": "https://example.test", "type": "string", "sensitive": false},
        "ports": {"value": [80, 443], "type": ["list", "number"]}
    }));
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs["url"], "https://example.test");
    assert_eq!(outputs["ports"], json!([80, 443]));
}

#[cfg(unix)]
mod cli {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Stand-in `terraform` that records its arguments and prints canned JSON.
    fn fake_terraform(dir: &TempDir) -> PathBuf {
        let log = dir.path().join("calls.log");
        let script = format!(
            r#"#!/bin/sh
echo "$*" >> "{log}"
case "$1" in
  init) exit 0 ;;
  plan) touch tfplan ;;
  show)
    if [ -n "$3" ]; then
      echo '{{"resource_changes":[{{"change":{{"actions":["create"]}}}},{{"change":{{"actions":["create"]}}}}]}}'
    else
      echo '{{"values":{{"root_module":{{"resources":[{{"address":"aws_s3_bucket.b","mode":"managed","type":"aws_s3_bucket","name":"b","provider_name":"registry.terraform.io/hashicorp/aws","values":{{"id":"bucket-1"}}}}]}}}}}}'
    fi ;;
  apply) exit 0 ;;
  output) echo '{{"bucket":{{"value":"bucket-1","type":"string"}}}}' ;;
  destroy) exit 0 ;;
  *) echo "unexpected $1" >&2; exit 1 ;;
esac
"#,
            log = log.display()
        );
        let path = dir.path().join("terraform");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn calls(dir: &TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn plan_apply_destroy_against_cli() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let executor = TerraformExecutor::new(work.path()).with_binary(fake_terraform(&bin));
        let mut request = request("dev", "terraform");
        request.options.parallelism = Some(4);
        let input = request.validate().unwrap();

        let plan = executor.plan("resource \"x\" \"y\" {}", &input).await.unwrap();
        assert_eq!(plan.resource_count, 2);

        let outcome = executor.apply("resource \"x\" \"y\" {}", &input, &plan).await.unwrap();
        assert_eq!(outcome.state.resources.len(), 1);
        assert_eq!(outcome.state.resources[0].id, "bucket-1");
        assert_eq!(outcome.outputs["bucket"], "bucket-1");
        let workdir = PathBuf::from(&outcome.destroy_target);
        assert!(workdir.starts_with(work.path()));
        assert_eq!(std::fs::read_to_string(workdir.join("main.tf")).unwrap(), "resource \"x\" \"y\" {}");

        executor.destroy(&outcome.destroy_target).await.unwrap();

        assert_eq!(
            calls(&bin),
            vec![
                "init -input=false -no-color",
                "plan -input=false -no-color -out=tfplan -parallelism=4",
                "show -json tfplan",
                "init -input=false -no-color",
                "apply -auto-approve -input=false -no-color -parallelism=4",
                "show -json",
                "output -json",
                "destroy -auto-approve -input=false -no-color",
            ]
        );
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let path = bin.path().join("terraform");
        std::fs::write(&path, "#!/bin/sh\necho 'Error: provider missing' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let executor = TerraformExecutor::new(work.path()).with_binary(path);

        let input = request("dev", "terraform").validate().unwrap();
        let err = executor.plan("", &input).await.unwrap_err();
        assert_eq!(err.to_string(), "terraform init failed (exit 1): Error: provider missing");
    }

    #[tokio::test]
    async fn wrong_shaped_plan_fails_the_plan() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let path = bin.path().join("terraform");
        let script = "#!/bin/sh\ncase \"$1\" in\n  show) echo '{\"resource_changes\":5}' ;;\n  *) exit 0 ;;\nesac\n";
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let executor = TerraformExecutor::new(work.path()).with_binary(path);

        let input = request("dev", "terraform").validate().unwrap();
        let err = executor.plan("", &input).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected terraform show output: 'resource_changes' is not an array"
        );
    }
}
