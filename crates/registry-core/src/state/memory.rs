// # Memory Entity Store
//
// In-memory implementation of EntityStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for dry runs of update requests.
//
// ## Crash Behavior
//
// - All domains and billing events are lost on restart/crash
// - No recovery possible (state is in-memory only)

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::billing::{BillingEvent, BillingEventId, Charge};
use crate::error::Result;
use crate::model::DomainSnapshot;
use crate::state::ledger::Ledger;
use crate::traits::entity_store::{CommitBatch, EntityStore};

/// In-memory entity store implementation
///
/// This implementation keeps the ledger behind a RwLock; commits take the
/// write lock for the whole batch. Clones share the same ledger.
///
/// # Example
///
/// ```rust
/// use registry_core::model::DomainSnapshot;
/// use registry_core::state::MemoryEntityStore;
/// use registry_core::traits::{CommitBatch, EntityStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryEntityStore::new();
///
///     let domain = DomainSnapshot::new("example.app", "app", "TheRegistrar");
///     store.commit(&CommitBatch::new(domain.clone(), Vec::new())).await?;
///
///     assert_eq!(store.load_domain("example.app").await?, Some(domain));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityStore {
    inner: Arc<RwLock<Ledger>>,
}

impl MemoryEntityStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of domains in the store
    pub async fn domain_count(&self) -> usize {
        self.inner.read().await.domain_count()
    }

    /// Get the number of billing events in the store
    pub async fn billing_event_count(&self) -> usize {
        self.inner.read().await.billing_event_count()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.domain_count() == 0 && guard.billing_event_count() == 0
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn load_domain(&self, fully_qualified_name: &str) -> Result<Option<DomainSnapshot>> {
        let guard = self.inner.read().await;
        Ok(guard.domain(fully_qualified_name).cloned())
    }

    async fn load_charge(&self, id: &BillingEventId) -> Result<Option<Charge>> {
        let guard = self.inner.read().await;
        Ok(guard.charge(id).cloned())
    }

    async fn billing_events_for(&self, fully_qualified_name: &str) -> Result<Vec<BillingEvent>> {
        let guard = self.inner.read().await;
        Ok(guard.events_for(fully_qualified_name))
    }

    async fn commit(&self, batch: &CommitBatch) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.apply(batch)
    }

    async fn flush(&self) -> Result<()> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{BillingEventFactory, BillingReason, HistoryEntryId, Money};
    use crate::error::Error;
    use chrono::Utc;

    fn charge(target: &str) -> Charge {
        let now = Utc::now();
        BillingEventFactory::charge()
            .reason(BillingReason::Create)
            .target_id(target)
            .registrar_id("TheRegistrar")
            .cost(Money::usd(1300))
            .period_years(1)
            .event_time(now)
            .billing_time(now)
            .parent_audit_id(HistoryEntryId::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_commit_and_load() {
        let store = MemoryEntityStore::new();
        assert!(store.is_empty().await);

        let domain = DomainSnapshot::new("example.app", "app", "TheRegistrar");
        let create = charge("example.app");
        store
            .commit(&CommitBatch::new(domain.clone(), vec![create.clone().into()]))
            .await
            .unwrap();

        assert_eq!(store.domain_count().await, 1);
        assert_eq!(store.billing_event_count().await, 1);
        assert_eq!(store.load_domain("example.app").await.unwrap(), Some(domain));
        assert_eq!(store.load_charge(&create.id()).await.unwrap(), Some(create));
        assert_eq!(store.billing_events_for("example.app").await.unwrap().len(), 1);
        assert!(store.billing_events_for("other.app").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_rejects_dangling_cancellation() {
        let store = MemoryEntityStore::new();
        let domain = DomainSnapshot::new("example.app", "app", "TheRegistrar");
        let unsaved = charge("example.app");
        let cancellation =
            BillingEventFactory::cancellation_for(&unsaved, Utc::now(), HistoryEntryId::new());

        let err = store
            .commit(&CommitBatch::new(domain, vec![cancellation.into()]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(store.is_empty().await, "failed commit must leave nothing behind");
    }

    #[tokio::test]
    async fn test_memory_store_rejects_rewriting_events() {
        let store = MemoryEntityStore::new();
        let domain = DomainSnapshot::new("example.app", "app", "TheRegistrar");
        let create = charge("example.app");

        store
            .commit(&CommitBatch::new(domain.clone(), vec![create.clone().into()]))
            .await
            .unwrap();
        let err = store
            .commit(&CommitBatch::new(domain, vec![create.into()]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(store.billing_event_count().await, 1);
    }
}
