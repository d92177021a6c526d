// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::request;
use crate::test_support::strategies::arb_deployment_status;
use crate::{Clock, FakeClock};
use proptest::prelude::*;
use std::time::Duration;

fn pending(environment: &str) -> (Deployment, FakeClock) {
    let clock = FakeClock::new();
    let input = request(environment, "terraform").validate().unwrap();
    (Deployment::new(&input, clock.utc_now()), clock)
}

#[yare::parameterized(
    pending     = { DeploymentStatus::Pending,    false },
    planning    = { DeploymentStatus::Planning,   false },
    applying    = { DeploymentStatus::Applying,   false },
    completed   = { DeploymentStatus::Completed,  true },
    failed      = { DeploymentStatus::Failed,     true },
    rolled_back = { DeploymentStatus::RolledBack, true },
)]
fn terminal_statuses(status: DeploymentStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[yare::parameterized(
    start          = { DeploymentStatus::Pending,   DeploymentStatus::Planning,   true },
    cancel_pending = { DeploymentStatus::Pending,   DeploymentStatus::Failed,     true },
    skip_to_apply  = { DeploymentStatus::Pending,   DeploymentStatus::Applying,   false },
    apply          = { DeploymentStatus::Planning,  DeploymentStatus::Applying,   true },
    dry_run        = { DeploymentStatus::Planning,  DeploymentStatus::Completed,  true },
    plan_failed    = { DeploymentStatus::Planning,  DeploymentStatus::Failed,     true },
    done           = { DeploymentStatus::Applying,  DeploymentStatus::Completed,  true },
    apply_failed   = { DeploymentStatus::Applying,  DeploymentStatus::Failed,     true },
    rollback       = { DeploymentStatus::Completed, DeploymentStatus::RolledBack, true },
    reopen         = { DeploymentStatus::Failed,    DeploymentStatus::Applying,   false },
    fail_completed = { DeploymentStatus::Completed, DeploymentStatus::Failed,     false },
    failed_twice   = { DeploymentStatus::Failed,    DeploymentStatus::Failed,     false },
    rollback_fail  = { DeploymentStatus::Failed,    DeploymentStatus::RolledBack, false },
)]
fn transition_table(from: DeploymentStatus, to: DeploymentStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn new_deployment_is_pending_and_owns_its_state_key() {
    let (deployment, _) = pending("dev");
    assert_eq!(deployment.status, DeploymentStatus::Pending);
    assert_eq!(deployment.state_key, deployment.id);
    assert!(deployment.started_at.is_none());
    assert!(deployment.completed_at.is_none());
    assert!(deployment.logs.is_empty());
}

#[test]
fn happy_path_stamps_started_and_completed() {
    let (mut deployment, clock) = pending("dev");
    deployment.transition(DeploymentStatus::Planning, clock.utc_now()).unwrap();
    assert!(deployment.started_at.is_none());

    clock.advance(Duration::from_secs(5));
    deployment.transition(DeploymentStatus::Applying, clock.utc_now()).unwrap();
    assert_eq!(deployment.started_at, Some(clock.utc_now()));

    clock.advance(Duration::from_secs(5));
    deployment.transition(DeploymentStatus::Completed, clock.utc_now()).unwrap();
    assert_eq!(deployment.completed_at, Some(clock.utc_now()));
    assert_eq!(deployment.duration_ms(), Some(10_000));
}

#[test]
fn rolled_back_keeps_original_completion_time() {
    let (mut deployment, clock) = pending("dev");
    for status in
        [DeploymentStatus::Planning, DeploymentStatus::Applying, DeploymentStatus::Completed]
    {
        deployment.transition(status, clock.utc_now()).unwrap();
    }
    let done = deployment.completed_at;
    clock.advance(Duration::from_secs(60));
    deployment.transition(DeploymentStatus::RolledBack, clock.utc_now()).unwrap();
    assert_eq!(deployment.completed_at, done);
}

#[test]
fn fail_records_error_only_when_allowed() {
    let (mut deployment, clock) = pending("dev");
    deployment.fail("boom", clock.utc_now()).unwrap();
    assert_eq!(deployment.error.as_deref(), Some("boom"));
    assert!(deployment.completed_at.is_some());

    let err = deployment.fail("again", clock.utc_now()).unwrap_err();
    assert_eq!(err, TransitionError { from: DeploymentStatus::Failed, to: DeploymentStatus::Failed });
    assert_eq!(deployment.error.as_deref(), Some("boom"));
}

#[test]
fn approval_required_only_in_production_without_auto_approve() {
    assert!(!pending("dev").0.requires_approval());
    assert!(!pending("staging").0.requires_approval());

    let (mut prod, _) = pending("production");
    assert!(prod.requires_approval());
    prod.options.auto_approve = true;
    assert!(!prod.requires_approval());
}

#[test]
fn rollback_deployment_inherits_lineage() {
    let (mut original, clock) = pending("staging");
    original.destroy_target = Some("/work/tf-1".to_string());
    let rollback = Deployment::rollback_of(&original, clock.utc_now());

    assert_ne!(rollback.id, original.id);
    assert_eq!(rollback.state_key, original.state_key);
    assert_eq!(rollback.rollback_of.as_ref(), Some(&original.id));
    assert_eq!(rollback.status, DeploymentStatus::Applying);
    assert!(rollback.started_at.is_some());
    assert!(rollback.completed_at.is_none());
    assert_eq!(rollback.blueprint_id, original.blueprint_id);
    assert_eq!(rollback.format, original.format);
    assert_eq!(rollback.destroy_target, original.destroy_target);
}

#[test]
fn deployment_serializes_wire_names() {
    let (mut deployment, clock) = pending("production");
    deployment.push_log(LogLevel::Info, "hello", None, clock.utc_now());
    let json = serde_json::to_value(&deployment).unwrap();

    assert_eq!(json["environment"], "production");
    assert_eq!(json["targetCloud"], "aws");
    assert_eq!(json["format"], "terraform");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["blueprintId"], "bp1");
    assert_eq!(json["logs"][0]["level"], "info");
    assert!(json.get("error").is_none());

    let parsed: Deployment = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, deployment);
}

#[test]
fn wire_enums_parse_and_reject() {
    assert_eq!("on-premise".parse::<TargetCloud>().unwrap(), TargetCloud::OnPremise);
    assert_eq!("cloudformation".parse::<IacFormat>().unwrap(), IacFormat::CloudFormation);
    assert_eq!("rolled_back".parse::<DeploymentStatus>().unwrap(), DeploymentStatus::RolledBack);

    let err = "qa".parse::<Environment>().unwrap_err();
    assert_eq!(err.to_string(), "unknown value 'qa', expected one of: dev, staging, production");
}

proptest! {
    #[test]
    fn display_and_parse_agree(status in arb_deployment_status()) {
        let parsed: DeploymentStatus = status.to_string().parse().unwrap();
        prop_assert_eq!(parsed, status);
    }

    #[test]
    fn terminal_statuses_only_leave_completed_for_rolled_back(
        from in arb_deployment_status(),
        to in arb_deployment_status(),
    ) {
        if from.is_terminal() && from.can_transition_to(to) {
            prop_assert_eq!(from, DeploymentStatus::Completed);
            prop_assert_eq!(to, DeploymentStatus::RolledBack);
        }
    }
}
