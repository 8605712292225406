//! Update reconciliation steps
//!
//! After the requested edits have been applied, each step observes the last
//! committed snapshot and the proposed one, and may rewrite the proposed
//! snapshot and emit billing events. Steps are stateless and run in a fixed
//! order:
//!
//! ```text
//! existing ──┐
//!            ▼
//! proposed ─► GracePeriodReconciler ─► StatusChangeBiller ─► (snapshot, events)
//! ```
//!
//! Steps never perform I/O. Any error aborts the whole pipeline and nothing it
//! computed is returned.

pub mod grace_period;
pub mod status_change;

pub use grace_period::GracePeriodReconciler;
pub use status_change::StatusChangeBiller;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::billing::{BillingEvent, BillingEventId, Charge, HistoryEntryId};
use crate::error::Result;
use crate::model::DomainSnapshot;
use crate::pricing::TldPricing;

/// Everything a step may read besides the two snapshots
///
/// Built once per update; `now` is reused for every derived time so that all
/// emitted records agree with each other.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    /// Time of the update
    pub now: DateTime<Utc>,
    /// Pricing of the domain's tld
    pub pricing: TldPricing,
    /// Audit entry that emitted billing events hang off
    pub history_id: HistoryEntryId,
    /// Registrar submitting the update
    pub registrar_id: String,
    /// Whether the update was requested by a registry administrator
    pub administrator_initiated: bool,
    /// Charges funding the existing snapshot's grace periods
    pub funding_charges: HashMap<BillingEventId, Charge>,
}

impl UpdateContext {
    pub fn new(
        now: DateTime<Utc>,
        pricing: TldPricing,
        history_id: HistoryEntryId,
        registrar_id: impl Into<String>,
    ) -> Self {
        Self {
            now,
            pricing,
            history_id,
            registrar_id: registrar_id.into(),
            administrator_initiated: false,
            funding_charges: HashMap::new(),
        }
    }

    /// Mark the update as administrator-initiated
    pub fn administrator_initiated(mut self, value: bool) -> Self {
        self.administrator_initiated = value;
        self
    }

    /// Make a funding charge available to the steps
    pub fn with_funding_charge(mut self, charge: Charge) -> Self {
        self.funding_charges.insert(charge.id(), charge);
        self
    }

    /// Look up a loaded funding charge
    pub fn funding_charge(&self, id: &BillingEventId) -> Option<&Charge> {
        self.funding_charges.get(id)
    }
}

/// Result of one step: the rewritten snapshot and the events it emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub snapshot: DomainSnapshot,
    pub events: Vec<BillingEvent>,
}

impl StepOutcome {
    /// Pass the snapshot through untouched, emitting nothing
    pub fn unchanged(snapshot: DomainSnapshot) -> Self {
        Self {
            snapshot,
            events: Vec::new(),
        }
    }
}

/// A side effect of a domain update
///
/// Implementations must be pure: the same inputs always produce the same
/// snapshot and equivalent events (ids aside).
pub trait ReconciliationStep: Send + Sync {
    /// Step name (for logging)
    fn name(&self) -> &'static str;

    /// Apply the step
    ///
    /// # Parameters
    ///
    /// - `existing`: Last committed snapshot
    /// - `proposed`: Snapshot with every requested edit and the effects of
    ///   earlier steps applied
    /// - `ctx`: Time, pricing and loaded charges of this update
    fn apply(
        &self,
        existing: &DomainSnapshot,
        proposed: DomainSnapshot,
        ctx: &UpdateContext,
    ) -> Result<StepOutcome>;
}

/// Ordered list of reconciliation steps
pub struct ReconciliationPipeline {
    steps: Vec<Box<dyn ReconciliationStep>>,
}

impl ReconciliationPipeline {
    /// Create a pipeline with no steps
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    /// The domain update pipeline: grace period conversion, then status billing
    pub fn standard() -> Self {
        Self::empty()
            .with_step(Box::new(GracePeriodReconciler))
            .with_step(Box::new(StatusChangeBiller))
    }

    /// Append a step
    pub fn with_step(mut self, step: Box<dyn ReconciliationStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Names of the steps, in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step in order
    ///
    /// The proposed snapshot is threaded through the steps; events are
    /// concatenated in the order they were emitted.
    pub fn run(
        &self,
        existing: &DomainSnapshot,
        proposed: DomainSnapshot,
        ctx: &UpdateContext,
    ) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::unchanged(proposed);
        for step in &self.steps {
            let StepOutcome { snapshot, events } = step.apply(existing, outcome.snapshot, ctx)?;
            debug!(
                "Step {} on {} emitted {} billing event(s)",
                step.name(),
                snapshot.fully_qualified_name,
                events.len()
            );
            outcome.snapshot = snapshot;
            outcome.events.extend(events);
        }
        Ok(outcome)
    }
}

impl Default for ReconciliationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
