// # Billing Event Factory
//
// Pure construction of billing records. Nothing here touches a store or a
// clock: every time and id the caller cares about is passed in.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::billing::event::{
    BillingEventId, BillingFlag, BillingReason, Cancellation, Charge, HistoryEntryId, Money,
};
use crate::error::{Error, Result};
use crate::model::GracePeriod;

/// Builder for a fresh [`Charge`]
///
/// `period_years` and `flags` are optional; every other field is required.
#[derive(Debug, Clone, Default)]
pub struct ChargeBuilder {
    reason: Option<BillingReason>,
    target_id: Option<String>,
    registrar_id: Option<String>,
    cost: Option<Money>,
    period_years: Option<u32>,
    flags: BTreeSet<BillingFlag>,
    event_time: Option<DateTime<Utc>>,
    billing_time: Option<DateTime<Utc>>,
    parent_audit_id: Option<HistoryEntryId>,
}

impl ChargeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reason(mut self, reason: BillingReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn registrar_id(mut self, registrar_id: impl Into<String>) -> Self {
        self.registrar_id = Some(registrar_id.into());
        self
    }

    pub fn cost(mut self, cost: Money) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn period_years(mut self, years: u32) -> Self {
        self.period_years = Some(years);
        self
    }

    pub fn flag(mut self, flag: BillingFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn flags(mut self, flags: BTreeSet<BillingFlag>) -> Self {
        self.flags = flags;
        self
    }

    pub fn event_time(mut self, time: DateTime<Utc>) -> Self {
        self.event_time = Some(time);
        self
    }

    pub fn billing_time(mut self, time: DateTime<Utc>) -> Self {
        self.billing_time = Some(time);
        self
    }

    pub fn parent_audit_id(mut self, id: HistoryEntryId) -> Self {
        self.parent_audit_id = Some(id);
        self
    }

    /// Build the charge under a freshly allocated id
    ///
    /// # Returns
    ///
    /// - `Ok(Charge)`: All required fields were set
    /// - `Err(Error::InvalidInput)`: Names the first missing field
    pub fn build(self) -> Result<Charge> {
        Ok(Charge {
            id: BillingEventId::new(),
            reason: required(self.reason, "reason")?,
            target_id: required(self.target_id, "target_id")?,
            registrar_id: required(self.registrar_id, "registrar_id")?,
            cost: required(self.cost, "cost")?,
            period_years: self.period_years,
            flags: self.flags,
            event_time: required(self.event_time, "event_time")?,
            billing_time: required(self.billing_time, "billing_time")?,
            parent_audit_id: required(self.parent_audit_id, "parent_audit_id")?,
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::invalid_input(format!("Charge is missing required field `{}`", field)))
}

/// Fields to replace when deriving a charge from an existing one
///
/// Anything left unset is copied from the source charge.
#[derive(Debug, Clone, Default)]
pub struct ChargeOverrides {
    reason: Option<BillingReason>,
    target_id: Option<String>,
    registrar_id: Option<String>,
    event_time: Option<DateTime<Utc>>,
    billing_time: Option<DateTime<Utc>>,
    parent_audit_id: Option<HistoryEntryId>,
}

impl ChargeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reason(mut self, reason: BillingReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn registrar_id(mut self, registrar_id: impl Into<String>) -> Self {
        self.registrar_id = Some(registrar_id.into());
        self
    }

    pub fn event_time(mut self, time: DateTime<Utc>) -> Self {
        self.event_time = Some(time);
        self
    }

    pub fn billing_time(mut self, time: DateTime<Utc>) -> Self {
        self.billing_time = Some(time);
        self
    }

    pub fn parent_audit_id(mut self, id: HistoryEntryId) -> Self {
        self.parent_audit_id = Some(id);
        self
    }
}

/// Constructs immutable billing records
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingEventFactory;

impl BillingEventFactory {
    /// Start a fresh charge
    pub fn charge() -> ChargeBuilder {
        ChargeBuilder::new()
    }

    /// Derive a new charge from `source`
    ///
    /// Cost, period and flags are always copied from the source; the
    /// remaining fields are copied unless overridden. The new charge gets its
    /// own id.
    pub fn derive_charge(source: &Charge, overrides: ChargeOverrides) -> Result<Charge> {
        ChargeBuilder {
            reason: Some(overrides.reason.unwrap_or(source.reason)),
            target_id: Some(overrides.target_id.unwrap_or_else(|| source.target_id.clone())),
            registrar_id: Some(
                overrides
                    .registrar_id
                    .unwrap_or_else(|| source.registrar_id.clone()),
            ),
            cost: Some(source.cost.clone()),
            period_years: source.period_years,
            flags: source.flags.clone(),
            event_time: Some(overrides.event_time.unwrap_or(source.event_time)),
            billing_time: Some(overrides.billing_time.unwrap_or(source.billing_time)),
            parent_audit_id: Some(overrides.parent_audit_id.unwrap_or(source.parent_audit_id)),
        }
        .build()
    }

    /// Build the cancellation that reverses `charge`
    ///
    /// # Parameters
    ///
    /// - `charge`: The charge being reversed
    /// - `event_time`: When the reversal happens
    /// - `parent_audit_id`: Audit entry of the operation causing the reversal
    pub fn cancellation_for(
        charge: &Charge,
        event_time: DateTime<Utc>,
        parent_audit_id: HistoryEntryId,
    ) -> Cancellation {
        Cancellation {
            id: BillingEventId::new(),
            referenced_charge: charge.id,
            reason: charge.reason,
            target_id: charge.target_id.clone(),
            registrar_id: charge.registrar_id.clone(),
            event_time,
            billing_time: charge.billing_time,
            parent_audit_id,
        }
    }

    /// Build the cancellation that reverses the charge funding `grace_period`
    ///
    /// The reversal is billed when the grace period would have ended and
    /// belongs to the registrar holding the grace period.
    pub fn cancellation_for_grace_period(
        charge: &Charge,
        grace_period: &GracePeriod,
        event_time: DateTime<Utc>,
        parent_audit_id: HistoryEntryId,
    ) -> Cancellation {
        Cancellation {
            registrar_id: grace_period.registrar_id.clone(),
            billing_time: grace_period.expiration_time,
            ..Self::cancellation_for(charge, event_time, parent_audit_id)
        }
    }
}
