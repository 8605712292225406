// # Ledger
//
// In-memory view shared by the store implementations: committed domain
// snapshots plus every billing event, kept in commit order.

use std::collections::HashMap;

use crate::billing::{BillingEvent, BillingEventId, Charge};
use crate::error::Result;
use crate::model::DomainSnapshot;
use crate::traits::CommitBatch;

#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    domains: HashMap<String, DomainSnapshot>,
    billing_events: HashMap<BillingEventId, BillingEvent>,
    commit_order: Vec<BillingEventId>,
}

impl Ledger {
    /// Rebuild a ledger from persisted parts, replaying events in order
    pub(crate) fn from_parts(
        domains: Vec<DomainSnapshot>,
        billing_events: Vec<BillingEvent>,
    ) -> Self {
        let mut ledger = Self::default();
        for domain in domains {
            ledger
                .domains
                .insert(domain.fully_qualified_name.clone(), domain);
        }
        for event in billing_events {
            ledger.commit_order.push(event.id());
            ledger.billing_events.insert(event.id(), event);
        }
        ledger
    }

    /// Domains and billing events in a stable order
    pub(crate) fn to_parts(&self) -> (Vec<DomainSnapshot>, Vec<BillingEvent>) {
        let mut domains: Vec<_> = self.domains.values().cloned().collect();
        domains.sort_by(|a, b| a.fully_qualified_name.cmp(&b.fully_qualified_name));
        let events = self
            .commit_order
            .iter()
            .filter_map(|id| self.billing_events.get(id).cloned())
            .collect();
        (domains, events)
    }

    pub(crate) fn domain(&self, fully_qualified_name: &str) -> Option<&DomainSnapshot> {
        self.domains.get(fully_qualified_name)
    }

    pub(crate) fn charge(&self, id: &BillingEventId) -> Option<&Charge> {
        self.billing_events.get(id).and_then(BillingEvent::as_charge)
    }

    pub(crate) fn events_for(&self, fully_qualified_name: &str) -> Vec<BillingEvent> {
        self.commit_order
            .iter()
            .filter_map(|id| self.billing_events.get(id))
            .filter(|event| event.target_id() == fully_qualified_name)
            .cloned()
            .collect()
    }

    pub(crate) fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub(crate) fn billing_event_count(&self) -> usize {
        self.billing_events.len()
    }

    /// Apply a batch, or nothing of it if any check fails
    pub(crate) fn apply(&mut self, batch: &CommitBatch) -> Result<()> {
        batch.check_against(&self.billing_events)?;

        self.domains.insert(
            batch.domain.fully_qualified_name.clone(),
            batch.domain.clone(),
        );
        for event in &batch.billing_events {
            self.commit_order.push(event.id());
            self.billing_events.insert(event.id(), event.clone());
        }
        Ok(())
    }
}
