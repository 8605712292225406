//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that count and record what the
//! coordinator does, plus fixtures for the usual domain shapes.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use registry_core::billing::{BillingEvent, BillingEventFactory, BillingEventId, BillingReason, Charge, HistoryEntryId, Money};
use registry_core::config::{RegistryConfig, TldConfig};
use registry_core::coordinator::{CoordinatorEvent, UpdateCoordinator};
use registry_core::error::{Error, Result};
use registry_core::model::{DomainSnapshot, GracePeriod, GracePeriodKind};
use registry_core::state::MemoryEntityStore;
use registry_core::traits::{CommitBatch, DnsRefreshQueue, EntityStore, FixedClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Registrar used throughout the fixtures
pub const REGISTRAR: &str = "TheRegistrar";

/// Tld configured by [`minimal_config`]
pub const TLD: &str = "app";

/// The instant every fixture update happens at
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// An entity store that counts calls and can be told to fail commits
///
/// Wraps a [`MemoryEntityStore`]; clones of the inner store observe the same
/// data, so tests can inspect what was committed.
pub struct CountingEntityStore {
    inner: MemoryEntityStore,
    /// Call counter for commit()
    commit_call_count: Arc<AtomicUsize>,
    /// Call counter for load_charge()
    load_charge_call_count: Arc<AtomicUsize>,
    /// Call counter for flush()
    flush_call_count: Arc<AtomicUsize>,
    /// Whether commit() fails
    fail_commits: Arc<AtomicBool>,
}

impl CountingEntityStore {
    pub fn new(inner: MemoryEntityStore) -> Self {
        Self {
            inner,
            commit_call_count: Arc::new(AtomicUsize::new(0)),
            load_charge_call_count: Arc::new(AtomicUsize::new(0)),
            flush_call_count: Arc::new(AtomicUsize::new(0)),
            fail_commits: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the number of times commit() was called
    pub fn commit_call_count(&self) -> usize {
        self.commit_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times load_charge() was called
    pub fn load_charge_call_count(&self) -> usize {
        self.load_charge_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times flush() was called
    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    /// Make every following commit fail
    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }

    /// Create a new CountingEntityStore that shares counters and data with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            commit_call_count: Arc::clone(&other.commit_call_count),
            load_charge_call_count: Arc::clone(&other.load_charge_call_count),
            flush_call_count: Arc::clone(&other.flush_call_count),
            fail_commits: Arc::clone(&other.fail_commits),
        }
    }
}

#[async_trait::async_trait]
impl EntityStore for CountingEntityStore {
    async fn load_domain(&self, fully_qualified_name: &str) -> Result<Option<DomainSnapshot>> {
        self.inner.load_domain(fully_qualified_name).await
    }

    async fn load_charge(&self, id: &BillingEventId) -> Result<Option<Charge>> {
        self.load_charge_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.load_charge(id).await
    }

    async fn billing_events_for(&self, fully_qualified_name: &str) -> Result<Vec<BillingEvent>> {
        self.inner.billing_events_for(fully_qualified_name).await
    }

    async fn commit(&self, batch: &CommitBatch) -> Result<()> {
        self.commit_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(Error::entity_store("commit refused by test double"));
        }
        self.inner.commit(batch).await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

/// A DNS refresh queue that records what was enqueued
pub struct RecordingDnsQueue {
    /// Recorded domain names
    enqueued: Arc<std::sync::Mutex<Vec<String>>>,
    /// Whether enqueue_refresh() fails
    failing: bool,
}

impl RecordingDnsQueue {
    pub fn new() -> Self {
        Self {
            enqueued: Arc::new(std::sync::Mutex::new(Vec::new())),
            failing: false,
        }
    }

    /// A queue whose every enqueue fails
    pub fn failing() -> Self {
        Self {
            enqueued: Arc::new(std::sync::Mutex::new(Vec::new())),
            failing: true,
        }
    }

    /// Get the list of domains that were enqueued
    pub fn enqueued(&self) -> Vec<String> {
        self.enqueued.lock().unwrap().clone()
    }

    /// Create a new RecordingDnsQueue that shares its record with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            enqueued: Arc::clone(&other.enqueued),
            failing: other.failing,
        }
    }
}

#[async_trait::async_trait]
impl DnsRefreshQueue for RecordingDnsQueue {
    async fn enqueue_refresh(&self, fully_qualified_name: &str) -> Result<()> {
        if self.failing {
            return Err(Error::dns_queue("queue unavailable"));
        }
        self.enqueued
            .lock()
            .unwrap()
            .push(fully_qualified_name.to_string());
        Ok(())
    }

    fn queue_name(&self) -> &'static str {
        "recording"
    }
}

/// Helper to create a minimal RegistryConfig for testing
///
/// One tld, [`TLD`], with a five day add grace period and a USD 20.00 status
/// change fee.
pub fn minimal_config() -> RegistryConfig {
    RegistryConfig::new().with_tld(
        TldConfig::new(TLD)
            .with_add_grace_period_secs(5 * 24 * 60 * 60)
            .with_server_status_change_fee(Money::usd(2000)),
    )
}

/// Everything a contract test needs to drive and observe a coordinator
pub struct Harness {
    pub coordinator: UpdateCoordinator,
    pub store: CountingEntityStore,
    pub data: MemoryEntityStore,
    pub dns_queue: RecordingDnsQueue,
    pub events: mpsc::Receiver<CoordinatorEvent>,
}

impl Harness {
    /// Build a coordinator over a fresh memory store, frozen at [`fixed_now`]
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_queue(config, RecordingDnsQueue::new())
    }

    /// Build a coordinator using the given DNS refresh queue
    pub fn with_queue(config: RegistryConfig, dns_queue: RecordingDnsQueue) -> Self {
        let data = MemoryEntityStore::new();
        let store = CountingEntityStore::new(data.clone());

        let (coordinator, events) = UpdateCoordinator::new(
            Box::new(CountingEntityStore::sharing_counters_with(&store)),
            Box::new(RecordingDnsQueue::sharing_counters_with(&dns_queue)),
            Box::new(FixedClock(fixed_now())),
            config,
        )
        .expect("coordinator construction succeeds");

        Self {
            coordinator,
            store,
            data,
            dns_queue,
            events,
        }
    }

    /// Seed a domain and its funding charges without going through an update
    pub async fn seed(&self, domain: DomainSnapshot, charges: Vec<Charge>) {
        let events = charges.into_iter().map(BillingEvent::from).collect();
        self.data
            .commit(&CommitBatch::new(domain, events))
            .await
            .expect("seeding succeeds");
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// A create charge for `name` billed `days_out` days after [`fixed_now`]
pub fn create_charge(name: &str, days_out: i64) -> Charge {
    BillingEventFactory::charge()
        .reason(BillingReason::Create)
        .target_id(name)
        .registrar_id(REGISTRAR)
        .cost(Money::usd(1300))
        .period_years(2)
        .event_time(fixed_now() - Duration::days(1))
        .billing_time(fixed_now() + Duration::days(days_out))
        .parent_audit_id(HistoryEntryId::new())
        .build()
        .expect("fixture charge is complete")
}

/// An undelegated domain holding an extended add grace period funded by `charge`
pub fn sunrush_domain(name: &str, charge: &Charge) -> DomainSnapshot {
    DomainSnapshot::new(name, TLD, REGISTRAR)
        .with_repository_id(format!("{}-APP", name.len()))
        .with_grace_period(GracePeriod::for_charge(GracePeriodKind::ExtendedAdd, charge))
}
