// # Billing Events
//
// Immutable financial records. A charge bills a registrar for an operation;
// a cancellation reverses exactly one earlier charge.
//
// Fields are private: events are only created through
// [`BillingEventFactory`](crate::billing::BillingEventFactory) or loaded from
// a store, and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Identifier of a billing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingEventId(Uuid);

impl BillingEventId {
    /// Allocate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BillingEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BillingEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the audit (history) entry an event belongs to
///
/// The entry itself is written by the caller; billing events only carry the
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryEntryId(Uuid);

impl HistoryEntryId {
    /// Allocate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HistoryEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HistoryEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A monetary amount in integer minor units
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// ISO 4217 currency code
    pub currency: String,
    /// Amount in cents
    pub amount_cents: i64,
}

impl Money {
    /// Create an amount in the given currency
    pub fn new(currency: impl Into<String>, amount_cents: i64) -> Self {
        Self {
            currency: currency.into(),
            amount_cents,
        }
    }

    /// Create a USD amount
    pub fn usd(amount_cents: i64) -> Self {
        Self::new("USD", amount_cents)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        write!(f, "{} {}{}.{:02}", self.currency, sign, abs / 100, abs % 100)
    }
}

/// Why a registrar is charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingReason {
    Create,
    Renew,
    Transfer,
    Restore,
    /// Flat fee for an administrator changing server statuses
    ServerStatus,
}

/// Flags carried over from the operation that created a charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingFlag {
    AnchorTenant,
    Landrush,
    Sunrise,
    Allocation,
}

/// A one-time charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub(crate) id: BillingEventId,
    pub(crate) reason: BillingReason,
    pub(crate) target_id: String,
    pub(crate) registrar_id: String,
    pub(crate) cost: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) period_years: Option<u32>,
    #[serde(default)]
    pub(crate) flags: BTreeSet<BillingFlag>,
    pub(crate) event_time: DateTime<Utc>,
    pub(crate) billing_time: DateTime<Utc>,
    pub(crate) parent_audit_id: HistoryEntryId,
}

impl Charge {
    pub fn id(&self) -> BillingEventId {
        self.id
    }

    pub fn reason(&self) -> BillingReason {
        self.reason
    }

    /// Name of the billed domain
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn registrar_id(&self) -> &str {
        &self.registrar_id
    }

    pub fn cost(&self) -> &Money {
        &self.cost
    }

    pub fn period_years(&self) -> Option<u32> {
        self.period_years
    }

    pub fn flags(&self) -> &BTreeSet<BillingFlag> {
        &self.flags
    }

    /// When the billed operation happened
    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    /// When the charge becomes final
    pub fn billing_time(&self) -> DateTime<Utc> {
        self.billing_time
    }

    pub fn parent_audit_id(&self) -> HistoryEntryId {
        self.parent_audit_id
    }
}

/// Reversal of one earlier charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub(crate) id: BillingEventId,
    pub(crate) referenced_charge: BillingEventId,
    pub(crate) reason: BillingReason,
    pub(crate) target_id: String,
    pub(crate) registrar_id: String,
    pub(crate) event_time: DateTime<Utc>,
    pub(crate) billing_time: DateTime<Utc>,
    pub(crate) parent_audit_id: HistoryEntryId,
}

impl Cancellation {
    pub fn id(&self) -> BillingEventId {
        self.id
    }

    /// The charge this cancellation reverses
    pub fn referenced_charge(&self) -> BillingEventId {
        self.referenced_charge
    }

    pub fn reason(&self) -> BillingReason {
        self.reason
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn registrar_id(&self) -> &str {
        &self.registrar_id
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    /// Billing time of the cancelled charge
    pub fn billing_time(&self) -> DateTime<Utc> {
        self.billing_time
    }

    pub fn parent_audit_id(&self) -> HistoryEntryId {
        self.parent_audit_id
    }
}

/// A billing record of either kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingEvent {
    Charge(Charge),
    Cancellation(Cancellation),
}

impl BillingEvent {
    pub fn id(&self) -> BillingEventId {
        match self {
            BillingEvent::Charge(charge) => charge.id(),
            BillingEvent::Cancellation(cancellation) => cancellation.id(),
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            BillingEvent::Charge(charge) => charge.target_id(),
            BillingEvent::Cancellation(cancellation) => cancellation.target_id(),
        }
    }

    pub fn as_charge(&self) -> Option<&Charge> {
        match self {
            BillingEvent::Charge(charge) => Some(charge),
            BillingEvent::Cancellation(_) => None,
        }
    }

    pub fn as_cancellation(&self) -> Option<&Cancellation> {
        match self {
            BillingEvent::Charge(_) => None,
            BillingEvent::Cancellation(cancellation) => Some(cancellation),
        }
    }
}

impl From<Charge> for BillingEvent {
    fn from(charge: Charge) -> Self {
        BillingEvent::Charge(charge)
    }
}

impl From<Cancellation> for BillingEvent {
    fn from(cancellation: Cancellation) -> Self {
        BillingEvent::Cancellation(cancellation)
    }
}
