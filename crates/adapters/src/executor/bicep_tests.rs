// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use stratum_core::test_support::request;
use yare::parameterized;

#[test]
fn resource_group_defaults_to_blueprint_and_environment() {
    let input = request("staging", "bicep").validate().unwrap();
    assert_eq!(resource_group(&input), "bp1-staging");

    let mut req = request("staging", "bicep");
    req.options.resource_group = Some("rg-shared".to_string());
    assert_eq!(resource_group(&req.validate().unwrap()), "rg-shared");
}

#[test]
fn what_if_counts_real_changes() {
    let plan = parse_what_if(json!({
        "status": "Succeeded",
        "changes": [
            {"resourceId": "/a", "changeType": "Create"},
            {"resourceId": "/b", "changeType": "Modify"},
            {"resourceId": "/c", "changeType": "NoChange"},
            {"resourceId": "/d", "changeType": "Delete"},
            {"resourceId": "/e", "changeType": "Ignore"},
            {"resourceId": "/f", "changeType": "Deploy"}
        ]
    }))
    .unwrap();
    assert_eq!(plan.resource_count, 4);
    assert_eq!(plan.changes, Some(ChangeSummary { add: 1, change: 2, destroy: 1 }));
    assert_eq!(plan.raw["status"], "Succeeded");
}

#[parameterized(
    simple = {
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct",
        "Microsoft.Storage/storageAccounts", "acct"
    },
    nested = {
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app/slots/stage",
        "Microsoft.Web/sites/slots", "app/stage"
    },
    no_provider = { "/subscriptions/s/resourceGroups/rg", "", "rg" },
)]
fn resource_id_split(id: &str, resource_type: &str, name: &str) {
    assert_eq!(split_resource_id(id), (resource_type.to_string(), name.to_string()));
}

#[test]
fn deployment_output_is_mapped() {
    let deployment = json!({
        "properties": {
            "provisioningState": "Succeeded",
            "outputResources": [
                {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/serverfarms/plan"},
                {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app"}
            ],
            "outputs": {
                "hostname": {"type": "String", "value": "app.azurewebsites.net"}
            }
        }
    });

    let resources = parse_output_resources(&deployment).unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[1].resource_type, "Microsoft.Web/sites");
    assert_eq!(resources[1].name, "app");
    assert_eq!(resources[1].provider, "azure");
    assert_eq!(resources[1].status, ResourceStatus::Created);

    let outputs = parse_outputs(&deployment);
    assert_eq!(outputs["hostname"], "app.azurewebsites.net");
}

#[test]
fn missing_properties_yield_nothing() {
    assert!(parse_output_resources(&json!({})).unwrap().is_empty());
    assert!(parse_outputs(&json!({"properties": {}})).is_empty());
}

#[parameterized(
    changes_not_an_array = { json!({"status": "Succeeded", "changes": {"a": 1}}) },
    top_level_array = { json!([{"changeType": "Create"}]) },
)]
fn malformed_what_if_is_rejected(what_if: Value) {
    let err = parse_what_if(what_if).unwrap_err();
    assert!(matches!(err, ExecutorError::Unexpected { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("unexpected az deployment group what-if output"));
}

#[parameterized(
    properties_not_an_object = { json!({"properties": "Succeeded"}) },
    output_resources_not_an_array = { json!({"properties": {"outputResources": "rg"}}) },
    top_level_null = { json!(null) },
)]
fn malformed_deployment_is_rejected(deployment: Value) {
    let err = parse_output_resources(&deployment).unwrap_err();
    assert!(matches!(err, ExecutorError::Unexpected { .. }), "got {err:?}");
}
