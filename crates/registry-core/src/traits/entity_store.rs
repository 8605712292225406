// # Entity Store Trait
//
// Defines the interface for loading and atomically committing the entities
// touched by a domain update.
//
// ## Purpose
//
// The store holds the committed domain snapshots and the billing ledger. An
// update commits its new snapshot together with every billing event it
// emitted in one batch: either all of it becomes visible or none of it does.
//
// ## Implementations
//
// - In-memory: `MemoryEntityStore`
// - File-based JSON ledger: `FileEntityStore`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::billing::{BillingEvent, BillingEventId, Charge};
use crate::error::{Error, Result};
use crate::model::DomainSnapshot;

/// Entities committed together by one update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitBatch {
    /// The domain snapshot to save
    pub domain: DomainSnapshot,
    /// Billing events to save, in creation order
    #[serde(default)]
    pub billing_events: Vec<BillingEvent>,
}

impl CommitBatch {
    pub fn new(domain: DomainSnapshot, billing_events: Vec<BillingEvent>) -> Self {
        Self {
            domain,
            billing_events,
        }
    }

    /// Check the batch against the already persisted billing events
    ///
    /// - billing events are immutable: no id may already be persisted
    /// - every cancellation must reference a charge, persisted or in this batch
    /// - the domain snapshot must be structurally valid
    pub fn check_against(&self, persisted: &HashMap<BillingEventId, BillingEvent>) -> Result<()> {
        self.domain.validate()?;

        let mut batch_charges = HashSet::new();
        for event in &self.billing_events {
            if persisted.contains_key(&event.id()) || !batch_charges.insert(event.id()) {
                return Err(Error::invariant(format!(
                    "Billing event {} already exists and cannot be rewritten",
                    event.id()
                )));
            }

            if let BillingEvent::Cancellation(cancellation) = event {
                let referenced = cancellation.referenced_charge();
                let is_charge = match persisted.get(&referenced) {
                    Some(existing) => existing.as_charge().is_some(),
                    None => self
                        .billing_events
                        .iter()
                        .any(|e| e.id() == referenced && e.as_charge().is_some()),
                };
                if !is_charge {
                    return Err(Error::invariant(format!(
                        "Cancellation {} references unknown charge {}",
                        cancellation.id(),
                        referenced
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Trait for entity store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
/// `commit` must be atomic with respect to every other method.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Serialize commits with locking
///
/// ## Forbidden Capabilities
/// - ❌ Derive billing events (owned by the reconciliation steps)
/// - ❌ Retry failed commits (owned by the caller)
/// - ❌ Enqueue DNS refreshes (owned by `UpdateCoordinator`)
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load the committed snapshot of a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DomainSnapshot))`: The last committed snapshot
    /// - `Ok(None)`: No such domain
    /// - `Err(Error)`: Storage error
    async fn load_domain(&self, fully_qualified_name: &str) -> Result<Option<DomainSnapshot>>;

    /// Load a persisted charge
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Charge))`: The charge
    /// - `Ok(None)`: No event with this id, or the event is a cancellation
    /// - `Err(Error)`: Storage error
    async fn load_charge(&self, id: &BillingEventId) -> Result<Option<Charge>>;

    /// List every billing event targeting a domain, in commit order
    async fn billing_events_for(&self, fully_qualified_name: &str) -> Result<Vec<BillingEvent>>;

    /// Atomically save a domain snapshot with its billing events
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Everything was saved
    /// - `Err(Error)`: Nothing was saved
    async fn commit(&self, batch: &CommitBatch) -> Result<()>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<()>;
}
