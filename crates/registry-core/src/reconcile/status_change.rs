// # Status Change Biller
//
// Registry administrators may add or remove server statuses on behalf of a
// registrar. Such an update is billed one flat fee, however many charged
// statuses it flips. Updates the registrar submits itself are never billed
// here.

use std::collections::BTreeSet;
use tracing::debug;

use crate::billing::{BillingEventFactory, BillingReason, Charge};
use crate::error::Result;
use crate::model::{DomainSnapshot, StatusValue, status_differences};
use crate::reconcile::{ReconciliationStep, StepOutcome, UpdateContext};

/// Bills administrator-initiated changes to charged statuses
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusChangeBiller;

impl StatusChangeBiller {
    /// Compute the status change charge of an update, if any
    ///
    /// # Parameters
    ///
    /// - `existing_statuses`: Statuses before the update
    /// - `new_statuses`: Statuses after the update
    /// - `target_id`: Name of the updated domain
    /// - `ctx`: Time, pricing, requesting registrar and whether an
    ///   administrator initiated the update
    ///
    /// # Returns
    ///
    /// At most one `SERVER_STATUS` charge, billed at `ctx.now`
    pub fn bill(
        &self,
        existing_statuses: &BTreeSet<StatusValue>,
        new_statuses: &BTreeSet<StatusValue>,
        target_id: &str,
        ctx: &UpdateContext,
    ) -> Result<Option<Charge>> {
        if !ctx.administrator_initiated {
            return Ok(None);
        }

        let charged: Vec<StatusValue> = status_differences(existing_statuses, new_statuses)
            .into_iter()
            .filter(|status| status.is_charged())
            .collect();
        if charged.is_empty() {
            return Ok(None);
        }

        debug!(
            "Billing status change on {} for {} charged status(es): {:?}",
            target_id,
            charged.len(),
            charged
        );

        BillingEventFactory::charge()
            .reason(BillingReason::ServerStatus)
            .target_id(target_id)
            .registrar_id(ctx.registrar_id.clone())
            .cost(ctx.pricing.server_status_change_fee.clone())
            .event_time(ctx.now)
            .billing_time(ctx.now)
            .parent_audit_id(ctx.history_id)
            .build()
            .map(Some)
    }
}

impl ReconciliationStep for StatusChangeBiller {
    fn name(&self) -> &'static str {
        "status_change"
    }

    fn apply(
        &self,
        existing: &DomainSnapshot,
        proposed: DomainSnapshot,
        ctx: &UpdateContext,
    ) -> Result<StepOutcome> {
        let charge = self.bill(
            &existing.statuses,
            &proposed.statuses,
            &proposed.fully_qualified_name,
            ctx,
        )?;
        Ok(StepOutcome {
            snapshot: proposed,
            events: charge.into_iter().map(Into::into).collect(),
        })
    }
}
