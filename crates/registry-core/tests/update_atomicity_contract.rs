//! Contract Test: Update Atomicity
//!
//! This test verifies that an update either commits its snapshot and every
//! billing event together, or commits nothing at all.
//!
//! Constraints verified:
//! - Configuration and invariant failures abort before any commit
//! - A failed commit never queues a DNS refresh
//! - A successful update commits once and queues exactly one refresh
//! - A failed DNS enqueue does not undo a committed update
//!
//! If this test fails, someone has:
//! - Split the commit into several writes
//! - Queued the DNS refresh before committing
//! - Added retries around the commit

mod common;

use common::*;
use registry_core::coordinator::{CoordinatorEvent, DomainEdits, UpdateRequest};
use registry_core::error::Error;
use registry_core::model::DomainSnapshot;
use registry_core::traits::EntityStore;

fn delegate(name: &str) -> UpdateRequest {
    UpdateRequest::new(name, REGISTRAR)
        .with_edits(DomainEdits::new().add_nameserver("ns1.example.net"))
}

#[tokio::test]
async fn successful_update_commits_once_and_queues_one_refresh() {
    let mut harness = Harness::new(minimal_config());
    let original = create_charge("ok.app", 30);
    harness
        .seed(sunrush_domain("ok.app", &original), vec![original])
        .await;

    harness
        .coordinator
        .update(delegate("ok.app"))
        .await
        .expect("update succeeds");

    assert_eq!(harness.store.commit_call_count(), 1);
    assert_eq!(harness.dns_queue.enqueued(), vec!["ok.app".to_string()]);

    let events = harness.drain_events();
    assert_eq!(
        events,
        vec![
            CoordinatorEvent::UpdateCommitted {
                domain: "ok.app".to_string(),
                billing_events: 2,
                converted_grace_period: true,
            },
            CoordinatorEvent::DnsRefreshQueued {
                domain: "ok.app".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn missing_tld_pricing_aborts_before_commit() {
    // Domain lives under a tld with no configured pricing
    let mut harness = Harness::new(minimal_config());
    let domain = DomainSnapshot::new("unpriced.dev", "dev", REGISTRAR);
    harness.seed(domain.clone(), Vec::new()).await;

    let err = harness
        .coordinator
        .update(delegate("unpriced.dev"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)), "Expected Config error, got {:?}", err);
    assert!(err.is_pre_commit());
    assert_eq!(harness.store.commit_call_count(), 0);
    assert!(harness.dns_queue.enqueued().is_empty());
    assert_eq!(
        harness.data.load_domain("unpriced.dev").await.unwrap(),
        Some(domain)
    );
    assert!(matches!(
        harness.drain_events().as_slice(),
        [CoordinatorEvent::UpdateRejected { .. }]
    ));
}

#[tokio::test]
async fn missing_funding_charge_is_an_invariant_violation() {
    // The extended grace period points at a charge that was never stored
    let harness = Harness::new(minimal_config());
    let unstored = create_charge("orphan.app", 30);
    harness
        .seed(sunrush_domain("orphan.app", &unstored), Vec::new())
        .await;

    let err = harness
        .coordinator
        .update(delegate("orphan.app"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvariantViolation(_)));
    assert_eq!(harness.store.load_charge_call_count(), 1);
    assert_eq!(harness.store.commit_call_count(), 0);
    assert!(harness.dns_queue.enqueued().is_empty());
    assert!(harness.data.billing_events_for("orphan.app").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_commit_queues_no_refresh() {
    let harness = Harness::new(minimal_config());
    let original = create_charge("refused.app", 30);
    harness
        .seed(sunrush_domain("refused.app", &original), vec![original])
        .await;
    harness.store.fail_commits();

    let err = harness
        .coordinator
        .update(delegate("refused.app"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EntityStore(_)));
    assert!(!err.is_pre_commit());
    assert_eq!(harness.store.commit_call_count(), 1, "No retries");
    assert!(harness.dns_queue.enqueued().is_empty());
    assert_eq!(
        harness.data.billing_events_for("refused.app").await.unwrap().len(),
        1,
        "Only the seeded charge"
    );
}

#[tokio::test]
async fn failed_dns_enqueue_keeps_committed_update() {
    let mut harness = Harness::with_queue(minimal_config(), RecordingDnsQueue::failing());
    harness
        .seed(DomainSnapshot::new("loose.app", TLD, REGISTRAR), Vec::new())
        .await;

    let outcome = harness.coordinator.update(delegate("loose.app")).await;

    assert!(outcome.is_ok(), "DNS queue failures are not propagated");
    assert_eq!(harness.store.commit_call_count(), 1);
    let committed = harness.data.load_domain("loose.app").await.unwrap().unwrap();
    assert!(committed.nameservers.contains("ns1.example.net"));
    assert!(
        harness
            .drain_events()
            .iter()
            .any(|event| matches!(event, CoordinatorEvent::DnsRefreshFailed { .. }))
    );
}

#[tokio::test]
async fn unknown_domain_is_not_found() {
    let harness = Harness::new(minimal_config());

    let err = harness
        .coordinator
        .update(delegate("ghost.app"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(harness.store.commit_call_count(), 0);
}

#[tokio::test]
async fn shutdown_flushes_store() {
    let harness = Harness::new(minimal_config());

    harness.coordinator.shutdown().await.unwrap();

    assert_eq!(harness.store.flush_call_count(), 1);
}
