//! Domain update coordinator
//!
//! The UpdateCoordinator is responsible for:
//! - Loading the committed domain and the charges funding its grace periods
//! - Applying the requested edits and running the reconciliation pipeline
//! - Committing the new snapshot and its billing events as one batch
//! - Queueing a DNS refresh once the batch is committed
//!
//! ## Architecture
//!
//! ```text
//!                  ┌────────────────────┐
//! UpdateRequest ──►│ UpdateCoordinator  │
//!                  └────────────────────┘
//!                            │
//!        ┌───────────────────┼───────────────────┬──────────────────┐
//!        │                   │                   │                  │
//!        ▼                   ▼                   ▼                  ▼
//! ┌─────────────┐   ┌─────────────────┐  ┌──────────────┐   ┌─────────────┐
//! │ EntityStore │   │ Reconciliation  │  │ DnsRefresh   │   │   Events    │
//! │ (load/commit)│  │ Pipeline (pure) │  │ Queue        │   │  (notify)   │
//! └─────────────┘   └─────────────────┘  └──────────────┘   └─────────────┘
//! ```
//!
//! ## Update Flow
//!
//! 1. Read the clock once
//! 2. Load the domain and resolve its tld pricing
//! 3. Load the charges referenced by the domain's grace periods
//! 4. Apply edits, run the pipeline, collect [`UpdateEffects`]
//! 5. Commit snapshot and billing events atomically
//! 6. Queue a DNS refresh (failures are logged, never propagated)
//! 7. Emit a [`CoordinatorEvent`] for monitoring

pub mod edits;

pub use edits::{DomainEdits, UpdateRequest};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::billing::{BillingEvent, BillingEventId, HistoryEntryId};
use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::model::DomainSnapshot;
use crate::pricing::PricingRegistry;
use crate::reconcile::{ReconciliationPipeline, StepOutcome, UpdateContext};
use crate::traits::{Clock, CommitBatch, DnsRefreshQueue, EntityStore};

/// Events emitted by the UpdateCoordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Snapshot and billing events committed
    UpdateCommitted {
        domain: String,
        billing_events: usize,
        converted_grace_period: bool,
    },

    /// Update aborted before commit, or the commit itself failed
    UpdateRejected { domain: String, error: String },

    /// DNS refresh queued
    DnsRefreshQueued { domain: String },

    /// DNS refresh could not be queued
    DnsRefreshFailed { domain: String, error: String },
}

/// Everything an update changes, computed before anything is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateEffects {
    /// Snapshot to persist
    pub snapshot: DomainSnapshot,
    /// Billing events to persist, in emission order
    pub billing_events: Vec<BillingEvent>,
    /// Domain whose DNS publication must be refreshed after commit
    pub dns_refresh: String,
}

impl UpdateEffects {
    /// Whether the update converted an extended add grace period
    pub fn converted_grace_period(&self) -> bool {
        self.billing_events
            .iter()
            .any(|event| event.as_cancellation().is_some())
    }

    fn into_batch(self) -> (CommitBatch, String) {
        (
            CommitBatch::new(self.snapshot, self.billing_events),
            self.dns_refresh,
        )
    }
}

/// Result of a committed update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// Audit entry the billing events hang off
    pub history_id: HistoryEntryId,
    /// What was committed
    pub effects: UpdateEffects,
}

/// Domain update coordinator
///
/// Owns the collaborators of an update. The reconciliation itself is pure and
/// lives in [`ReconciliationPipeline`]; the coordinator only performs the
/// surrounding I/O.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateCoordinator::new()`]
/// 2. Call [`UpdateCoordinator::update()`] once per update request
/// 3. Call [`UpdateCoordinator::shutdown()`] to flush the store
///
/// ## Retries
///
/// The coordinator never retries. A failed update leaves the store untouched
/// and may be resubmitted by the caller.
pub struct UpdateCoordinator {
    /// Persistence for domains and billing events
    store: Box<dyn EntityStore>,

    /// Queue receiving DNS refresh requests
    dns_queue: Box<dyn DnsRefreshQueue>,

    /// Time source
    clock: Box<dyn Clock>,

    /// Per-tld pricing
    pricing: PricingRegistry,

    /// Reconciliation steps
    pipeline: ReconciliationPipeline,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<CoordinatorEvent>,
}

impl UpdateCoordinator {
    /// Create a new update coordinator
    ///
    /// # Parameters
    ///
    /// - `store`: Entity store implementation
    /// - `dns_queue`: DNS refresh queue implementation
    /// - `clock`: Time source
    /// - `config`: Registry configuration
    ///
    /// # Returns
    ///
    /// A tuple of (coordinator, event_receiver) where event_receiver yields
    /// coordinator events
    pub fn new(
        store: Box<dyn EntityStore>,
        dns_queue: Box<dyn DnsRefreshQueue>,
        clock: Box<dyn Clock>,
        config: RegistryConfig,
    ) -> Result<(Self, mpsc::Receiver<CoordinatorEvent>)> {
        config.validate()?;

        let pricing = PricingRegistry::from_config(&config)?;
        let (tx, rx) = mpsc::channel(config.coordinator.event_channel_capacity);

        let coordinator = Self {
            store,
            dns_queue,
            clock,
            pricing,
            pipeline: ReconciliationPipeline::standard(),
            event_tx: tx,
        };

        Ok((coordinator, rx))
    }

    /// Replace the reconciliation pipeline
    pub fn with_pipeline(mut self, pipeline: ReconciliationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Pricing registry in use
    pub fn pricing(&self) -> &PricingRegistry {
        &self.pricing
    }

    /// Compute the effects of an update without persisting anything
    ///
    /// # Parameters
    ///
    /// - `existing`: Last committed snapshot
    /// - `request`: Requested edits
    /// - `ctx`: Time, pricing and funding charges of this update
    pub fn plan(
        &self,
        existing: &DomainSnapshot,
        request: &UpdateRequest,
        ctx: &UpdateContext,
    ) -> Result<UpdateEffects> {
        let proposed = request.edits.apply(existing)?;
        let StepOutcome { snapshot, events } = self.pipeline.run(existing, proposed, ctx)?;
        let dns_refresh = snapshot.fully_qualified_name.clone();

        Ok(UpdateEffects {
            snapshot,
            billing_events: events,
            dns_refresh,
        })
    }

    /// Apply an update request
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome)`: Snapshot and events committed
    /// - `Err(Error::NotFound)`: Domain does not exist
    /// - `Err(Error::Config)`: Domain's tld has no pricing
    /// - `Err(Error::InvariantViolation)`: Domain state is inconsistent
    /// - `Err(Error::EntityStore)`: Commit failed; nothing was persisted
    pub async fn update(&self, request: UpdateRequest) -> Result<UpdateOutcome> {
        let domain = request.domain_name.clone();
        match self.update_internal(request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Update of {} rejected: {}", domain, e);
                self.emit_event(CoordinatorEvent::UpdateRejected {
                    domain,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn update_internal(&self, request: UpdateRequest) -> Result<UpdateOutcome> {
        let now = self.clock.now();

        let existing = self
            .store
            .load_domain(&request.domain_name)
            .await?
            .ok_or_else(|| Error::not_found(format!("Domain {}", request.domain_name)))?;

        let pricing = self.pricing.pricing_for(&existing.tld)?;

        let history_id = HistoryEntryId::new();
        let mut ctx = UpdateContext::new(now, pricing, history_id, &request.registrar_id)
            .administrator_initiated(request.administrator_initiated);
        for id in funding_charge_ids(&existing) {
            match self.store.load_charge(&id).await? {
                Some(charge) => ctx = ctx.with_funding_charge(charge),
                None => debug!(
                    "Charge {} referenced by {} is not in the store",
                    id, existing.fully_qualified_name
                ),
            }
        }

        let effects = self.plan(&existing, &request, &ctx)?;
        let converted = effects.converted_grace_period();
        let event_count = effects.billing_events.len();

        let (batch, dns_refresh) = effects.clone().into_batch();
        self.store.commit(&batch).await?;

        info!(
            "Committed update of {} ({} billing event(s), history {})",
            dns_refresh, event_count, history_id
        );
        self.emit_event(CoordinatorEvent::UpdateCommitted {
            domain: dns_refresh.clone(),
            billing_events: event_count,
            converted_grace_period: converted,
        });

        self.queue_dns_refresh(&dns_refresh).await;

        Ok(UpdateOutcome {
            history_id,
            effects,
        })
    }

    /// Commit a batch that was produced outside the update flow
    ///
    /// Used to seed domains created elsewhere, together with the charges that
    /// fund their grace periods. The batch is checked like any other commit.
    pub async fn import(&self, batch: CommitBatch) -> Result<()> {
        self.store.commit(&batch).await?;
        info!(
            "Imported {} with {} billing event(s)",
            batch.domain.fully_qualified_name,
            batch.billing_events.len()
        );
        Ok(())
    }

    /// Queue a DNS refresh for a committed domain
    ///
    /// The update is already durable at this point, so a failure here is
    /// reported and swallowed.
    async fn queue_dns_refresh(&self, fully_qualified_name: &str) {
        match self.dns_queue.enqueue_refresh(fully_qualified_name).await {
            Ok(()) => {
                debug!(
                    "Queued DNS refresh for {} on {}",
                    fully_qualified_name,
                    self.dns_queue.queue_name()
                );
                self.emit_event(CoordinatorEvent::DnsRefreshQueued {
                    domain: fully_qualified_name.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    "Failed to queue DNS refresh for {} on {}: {}",
                    fully_qualified_name,
                    self.dns_queue.queue_name(),
                    e
                );
                self.emit_event(CoordinatorEvent::DnsRefreshFailed {
                    domain: fully_qualified_name.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Flush the entity store
    pub async fn shutdown(&self) -> Result<()> {
        self.store.flush().await?;
        info!("Entity store flushed, coordinator stopped");
        Ok(())
    }

    /// Emit a coordinator event
    fn emit_event(&self, event: CoordinatorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}

/// Ids of the charges funding a snapshot's grace periods
fn funding_charge_ids(snapshot: &DomainSnapshot) -> Vec<BillingEventId> {
    snapshot
        .grace_periods
        .iter()
        .filter_map(|gp| gp.billing_event_ref)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{BillingEventFactory, BillingReason, Money};
    use crate::config::TldConfig;
    use crate::model::{GracePeriod, GracePeriodKind, StatusValue};
    use crate::pricing::TldPricing;
    use crate::queue::ChannelDnsQueue;
    use crate::state::MemoryEntityStore;
    use crate::traits::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    fn coordinator() -> UpdateCoordinator {
        let (queue, _rx) = ChannelDnsQueue::new();
        let config = RegistryConfig::new().with_tld(TldConfig::new("app"));
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let (coordinator, _events) = UpdateCoordinator::new(
            Box::new(MemoryEntityStore::new()),
            Box::new(queue),
            Box::new(clock),
            config,
        )
        .unwrap();
        coordinator
    }

    #[test]
    fn test_plan_converts_extended_add() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let charge = BillingEventFactory::charge()
            .reason(BillingReason::Create)
            .target_id("example.app")
            .registrar_id("TheRegistrar")
            .cost(Money::usd(1300))
            .period_years(1)
            .event_time(now - Duration::days(1))
            .billing_time(now + Duration::days(30))
            .parent_audit_id(HistoryEntryId::new())
            .build()
            .unwrap();
        let existing = DomainSnapshot::new("example.app", "app", "TheRegistrar")
            .with_grace_period(GracePeriod::for_charge(GracePeriodKind::ExtendedAdd, &charge));
        let request = UpdateRequest::new("example.app", "TheRegistrar")
            .with_edits(DomainEdits::new().add_nameserver("ns1.example.net"));
        let ctx = UpdateContext::new(
            now,
            TldPricing::new(Duration::days(5), Money::usd(2000)),
            HistoryEntryId::new(),
            "TheRegistrar",
        )
        .with_funding_charge(charge);

        let effects = coordinator().plan(&existing, &request, &ctx).unwrap();

        assert!(effects.converted_grace_period());
        assert_eq!(effects.billing_events.len(), 2);
        assert_eq!(effects.dns_refresh, "example.app");
        assert!(effects.snapshot.extended_add_grace_period().unwrap().is_none());
    }

    #[test]
    fn test_plan_rejects_conflicting_edits() {
        let existing = DomainSnapshot::new("example.app", "app", "TheRegistrar");
        let request = UpdateRequest::new("example.app", "TheRegistrar").with_edits(
            DomainEdits::new()
                .add_status(StatusValue::ClientHold)
                .remove_status(StatusValue::ClientHold),
        );
        let ctx = UpdateContext::new(
            Utc::now(),
            TldPricing::new(Duration::days(5), Money::usd(2000)),
            HistoryEntryId::new(),
            "TheRegistrar",
        );

        let err = coordinator().plan(&existing, &request, &ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_commits_after_event_receiver_dropped() {
        let store = MemoryEntityStore::new();
        store
            .commit(&CommitBatch::new(
                DomainSnapshot::new("example.app", "app", "TheRegistrar"),
                Vec::new(),
            ))
            .await
            .unwrap();
        let (queue, _rx) = ChannelDnsQueue::new();
        let (coordinator, events) = UpdateCoordinator::new(
            Box::new(store.clone()),
            Box::new(queue),
            Box::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())),
            RegistryConfig::new().with_tld(TldConfig::new("app")),
        )
        .unwrap();
        drop(events);

        let outcome = coordinator
            .update(
                UpdateRequest::new("example.app", "TheRegistrar")
                    .with_edits(DomainEdits::new().add_nameserver("ns1.example.net")),
            )
            .await;

        assert!(outcome.is_ok());
        let committed = store.load_domain("example.app").await.unwrap().unwrap();
        assert!(committed.nameservers.contains("ns1.example.net"));
    }

    #[test]
    fn test_full_event_channel_drops_events() {
        let (queue, _rx) = ChannelDnsQueue::new();
        let mut config = RegistryConfig::new().with_tld(TldConfig::new("app"));
        config.coordinator.event_channel_capacity = 1;
        let (coordinator, mut events) = UpdateCoordinator::new(
            Box::new(MemoryEntityStore::new()),
            Box::new(queue),
            Box::new(FixedClock(Utc::now())),
            config,
        )
        .unwrap();

        for domain in ["a.app", "b.app"] {
            coordinator.emit_event(CoordinatorEvent::DnsRefreshQueued {
                domain: domain.to_string(),
            });
        }

        assert_eq!(
            events.try_recv().unwrap(),
            CoordinatorEvent::DnsRefreshQueued {
                domain: "a.app".to_string()
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_unknown_domain_not_found() {
        let err = coordinator()
            .update(UpdateRequest::new("missing.app", "TheRegistrar"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
