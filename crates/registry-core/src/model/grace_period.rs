// # Grace Periods
//
// A grace period is a time-bounded right attached to a domain: during it the
// operation that created it can be reversed, usually with a refund of the
// charge that funded it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::billing::{BillingEventId, Charge};

/// Kind of grace period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GracePeriodKind {
    /// Standard add grace period after a create
    Add,
    /// After an explicit renew
    Renew,
    /// After a completed transfer
    Transfer,
    /// After the registry auto-renewed the domain
    AutoRenew,
    /// Restore window after a delete
    Redemption,
    /// Longer add grace period granted under special launch conditions
    ///
    /// Converted to a standard [`GracePeriodKind::Add`] once the domain
    /// becomes actively delegated.
    ExtendedAdd,
}

impl fmt::Display for GracePeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GracePeriodKind::Add => "ADD",
            GracePeriodKind::Renew => "RENEW",
            GracePeriodKind::Transfer => "TRANSFER",
            GracePeriodKind::AutoRenew => "AUTO_RENEW",
            GracePeriodKind::Redemption => "REDEMPTION",
            GracePeriodKind::ExtendedAdd => "EXTENDED_ADD",
        };
        f.write_str(name)
    }
}

/// A grace period held by a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GracePeriod {
    /// The kind of grace period
    pub kind: GracePeriodKind,
    /// When the grace period ends
    pub expiration_time: DateTime<Utc>,
    /// Registrar that holds the grace period
    pub registrar_id: String,
    /// The charge that funded this grace period, if it carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_event_ref: Option<BillingEventId>,
}

impl GracePeriod {
    /// Create a grace period funded by `charge`
    ///
    /// The grace period ends at the charge's billing time and belongs to the
    /// charged registrar.
    pub fn for_charge(kind: GracePeriodKind, charge: &Charge) -> Self {
        Self {
            kind,
            expiration_time: charge.billing_time(),
            registrar_id: charge.registrar_id().to_string(),
            billing_event_ref: Some(charge.id()),
        }
    }

    /// Create a grace period that never carried a charge (e.g. redemption)
    pub fn without_charge(
        kind: GracePeriodKind,
        expiration_time: DateTime<Utc>,
        registrar_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            expiration_time,
            registrar_id: registrar_id.into(),
            billing_event_ref: None,
        }
    }

    /// Whether this is the extended (launch) add grace period
    pub fn is_extended_add(&self) -> bool {
        self.kind == GracePeriodKind::ExtendedAdd
    }
}
