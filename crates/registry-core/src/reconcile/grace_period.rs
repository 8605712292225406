// # Grace Period Reconciler
//
// A domain created under special launch conditions holds an extended add
// grace period for as long as it is not delegated. The first update that
// makes it publishable (adding a nameserver, lifting a hold) converts that
// grace period into a standard add grace period:
//
// 1. the extended grace period is removed
// 2. the charge that funded it is cancelled
// 3. a new create charge, identical in price, is billed at
//    `min(now + add grace period length, extended expiration)`
// 4. an add grace period funded by the new charge is attached
//
// The cap means a conversion never grants time the extended period did not
// already cover.

use tracing::{debug, info};

use crate::billing::{BillingEventFactory, BillingReason, Charge, ChargeOverrides};
use crate::error::{Error, Result};
use crate::model::{DomainSnapshot, GracePeriod, GracePeriodKind};
use crate::reconcile::{ReconciliationStep, StepOutcome, UpdateContext};

/// Converts an extended add grace period once the domain becomes publishable
#[derive(Debug, Clone, Copy, Default)]
pub struct GracePeriodReconciler;

impl GracePeriodReconciler {
    /// Reconcile the grace periods of an updated domain
    ///
    /// # Returns
    ///
    /// - `Ok(StepOutcome)`: Either `updated` untouched with no events, or the
    ///   converted snapshot with `[Cancellation, Charge]`
    /// - `Err(Error::InvariantViolation)`: The extended grace period has no
    ///   loadable funding charge, or the existing snapshot holds several
    pub fn reconcile(
        &self,
        existing: &DomainSnapshot,
        updated: DomainSnapshot,
        ctx: &UpdateContext,
    ) -> Result<StepOutcome> {
        let Some(extended) = existing.extended_add_grace_period()? else {
            return Ok(StepOutcome::unchanged(updated));
        };

        if !updated.should_publish_to_dns() {
            debug!(
                "{} keeps its {} grace period: not publishable after update",
                updated.fully_qualified_name, extended.kind
            );
            return Ok(StepOutcome::unchanged(updated));
        }

        let original = Self::funding_charge(existing, extended, ctx)?;

        let mut snapshot = updated;
        snapshot.remove_grace_period(extended);

        let cancellation = BillingEventFactory::cancellation_for_grace_period(
            original,
            extended,
            ctx.now,
            ctx.history_id,
        );

        let expiration = ctx
            .now
            .checked_add_signed(ctx.pricing.add_grace_period_length)
            .ok_or_else(|| {
                Error::config(format!(
                    "Add grace period of {} runs past the supported date range",
                    snapshot.tld
                ))
            })?
            .min(extended.expiration_time);

        // Recorded even when the cap equals the old expiration: event time differs
        let charge = BillingEventFactory::derive_charge(
            original,
            ChargeOverrides::new()
                .reason(BillingReason::Create)
                .target_id(snapshot.fully_qualified_name.clone())
                .registrar_id(extended.registrar_id.clone())
                .event_time(ctx.now)
                .billing_time(expiration)
                .parent_audit_id(ctx.history_id),
        )?;

        snapshot.add_grace_period(GracePeriod::for_charge(GracePeriodKind::Add, &charge));

        info!(
            "Converted {} grace period of {} to {} (expires {}, cancelled charge {})",
            GracePeriodKind::ExtendedAdd,
            snapshot.fully_qualified_name,
            GracePeriodKind::Add,
            expiration,
            original.id()
        );

        Ok(StepOutcome {
            snapshot,
            events: vec![cancellation.into(), charge.into()],
        })
    }

    fn funding_charge<'a>(
        existing: &DomainSnapshot,
        extended: &GracePeriod,
        ctx: &'a UpdateContext,
    ) -> Result<&'a Charge> {
        let id = extended.billing_event_ref.ok_or_else(|| {
            Error::invariant(format!(
                "{} grace period of {} has no funding charge",
                extended.kind, existing.fully_qualified_name
            ))
        })?;

        ctx.funding_charge(&id).ok_or_else(|| {
            Error::invariant(format!(
                "Funding charge {} of {} grace period on {} does not exist",
                id, extended.kind, existing.fully_qualified_name
            ))
        })
    }
}

impl ReconciliationStep for GracePeriodReconciler {
    fn name(&self) -> &'static str {
        "grace_period"
    }

    fn apply(
        &self,
        existing: &DomainSnapshot,
        proposed: DomainSnapshot,
        ctx: &UpdateContext,
    ) -> Result<StepOutcome> {
        self.reconcile(existing, proposed, ctx)
    }
}
