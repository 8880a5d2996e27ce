//! Payment intake against the JSON store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;

use mchost_common::{CreateServerRequest, PAYMENT_FAILED, PaymentEvent, PlanType};
use mchost_server::application::services::{Actor, IntakeOutcome};
use mchost_server::domain::IntakeError;

use crate::common::{BASE_PORT, TestHost, succeeded_event};

fn event(value: serde_json::Value) -> PaymentEvent {
    serde_json::from_value(value).expect("event json")
}

#[tokio::test]
async fn first_payment_gets_base_port() {
    let host = TestHost::new().await;

    let outcome = host
        .intake
        .handle_event(&event(succeeded_event("pi_1", "42", "java")))
        .await
        .expect("intake");

    let IntakeOutcome::Provisioned(record) = outcome else {
        panic!("expected a new record, got {outcome:?}");
    };
    assert_eq!(record.owner, 42);
    assert_eq!(record.port, BASE_PORT);
    assert_eq!(record.plan_type, PlanType::Java);
    assert_eq!(record.cpu_cores, 4);
    assert_eq!(record.mem_limit, "8g");
    assert_eq!(record.storage, "50 GB");
    assert_eq!(record.backup_type, "daily");
    assert!(!record.is_active);
    assert!(record.container_ref.is_none());
}

#[tokio::test]
async fn redelivered_payment_creates_one_record() {
    let host = TestHost::new().await;
    let payment = event(succeeded_event("pi_dup", "7", "be"));

    let first = host.intake.handle_event(&payment).await.expect("first");
    let second = host.intake.handle_event(&payment).await.expect("second");

    let IntakeOutcome::Provisioned(record) = first else {
        panic!("expected a new record");
    };
    assert_eq!(second, IntakeOutcome::Duplicate { server_id: record.id });
    let all = host.lifecycle.list(Actor::Operator).await.expect("list");
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn concurrent_payments_get_distinct_ports() {
    let host = TestHost::new().await;

    let mut tasks = Vec::new();
    for n in 0..8 {
        let intake = host.intake.clone();
        tasks.push(tokio::spawn(async move {
            intake
                .handle_event(&event(succeeded_event(&format!("pi_{n}"), "1", "java")))
                .await
        }));
    }
    let mut ports = HashSet::new();
    for task in tasks {
        match task.await.expect("join").expect("intake") {
            IntakeOutcome::Provisioned(record) => assert!(ports.insert(record.port)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    let expected: HashSet<u16> = (BASE_PORT..BASE_PORT + 8).collect();
    assert_eq!(ports, expected);
}

#[tokio::test]
async fn bad_metadata_creates_nothing() {
    let host = TestHost::new().await;
    let mut value = succeeded_event("pi_bad", "3", "java");
    value["data"]["object"]["metadata"]["ram"] = "plenty".into();

    let err = host.intake.handle_event(&event(value)).await.unwrap_err();
    assert!(matches!(err, IntakeError::Plan(_)));
    assert!(!err.is_retryable());
    assert!(host.lifecycle.list(Actor::Operator).await.expect("list").is_empty());
}

#[tokio::test]
async fn unknown_plan_is_rejected() {
    let host = TestHost::new().await;
    let err = host
        .intake
        .handle_event(&event(succeeded_event("pi_x", "3", "minecraft-deluxe")))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::UnknownPlan(_)));
}

#[tokio::test]
async fn failed_payments_are_ignored() {
    let host = TestHost::new().await;
    let mut value = succeeded_event("pi_f", "3", "java");
    value["type"] = PAYMENT_FAILED.into();

    let outcome = host.intake.handle_event(&event(value)).await.expect("intake");
    assert!(matches!(outcome, IntakeOutcome::Ignored { .. }));
    assert!(host.lifecycle.list(Actor::Operator).await.expect("list").is_empty());
}

#[tokio::test]
async fn operator_create_continues_port_sequence() {
    let host = TestHost::new().await;
    host.intake
        .handle_event(&event(succeeded_event("pi_a", "5", "java")))
        .await
        .expect("intake");

    let record = host
        .intake
        .create_for_operator(&CreateServerRequest {
            owner: 9,
            plan_type: "web".into(),
            cpu: None,
            ram: None,
            storage: None,
            backup: None,
        })
        .await
        .expect("create");

    assert_eq!(record.port, BASE_PORT + 1);
    assert_eq!(record.plan_type, PlanType::WebHosting);
    assert_eq!(record.cpu_cores, 2);
    assert_eq!(record.mem_limit, "2g");
}

#[tokio::test]
async fn tenants_only_list_their_own_servers() {
    let host = TestHost::new().await;
    for (payment, owner) in [("pi_1", "1"), ("pi_2", "2"), ("pi_3", "1")] {
        host.intake
            .handle_event(&event(succeeded_event(payment, owner, "java")))
            .await
            .expect("intake");
    }

    let mine = host.lifecycle.list(Actor::Tenant(1)).await.expect("list");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|r| r.owner == 1));
    assert_eq!(host.lifecycle.list(Actor::Operator).await.expect("list").len(), 3);
}
