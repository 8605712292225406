// # Status Values
//
// The registry status vocabulary carried by a domain.
//
// Two fixed classifications drive the update reconciliation:
// - publication-blocking statuses keep a domain out of the zone
// - charged statuses (the `server*` locks) incur a flat fee when an
//   administrator adds or removes them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A domain status flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusValue {
    Ok,
    Inactive,
    ClientDeleteProhibited,
    ClientHold,
    ClientRenewProhibited,
    ClientTransferProhibited,
    ClientUpdateProhibited,
    Linked,
    PendingCreate,
    PendingDelete,
    PendingRenew,
    PendingTransfer,
    PendingUpdate,
    ServerDeleteProhibited,
    ServerHold,
    ServerRenewProhibited,
    ServerTransferProhibited,
    ServerUpdateProhibited,
}

impl StatusValue {
    /// Every status value, in wire order
    pub const ALL: [StatusValue; 18] = [
        StatusValue::Ok,
        StatusValue::Inactive,
        StatusValue::ClientDeleteProhibited,
        StatusValue::ClientHold,
        StatusValue::ClientRenewProhibited,
        StatusValue::ClientTransferProhibited,
        StatusValue::ClientUpdateProhibited,
        StatusValue::Linked,
        StatusValue::PendingCreate,
        StatusValue::PendingDelete,
        StatusValue::PendingRenew,
        StatusValue::PendingTransfer,
        StatusValue::PendingUpdate,
        StatusValue::ServerDeleteProhibited,
        StatusValue::ServerHold,
        StatusValue::ServerRenewProhibited,
        StatusValue::ServerTransferProhibited,
        StatusValue::ServerUpdateProhibited,
    ];

    /// Protocol name of the status (e.g. `clientHold`)
    pub fn wire_name(self) -> &'static str {
        match self {
            StatusValue::Ok => "ok",
            StatusValue::Inactive => "inactive",
            StatusValue::ClientDeleteProhibited => "clientDeleteProhibited",
            StatusValue::ClientHold => "clientHold",
            StatusValue::ClientRenewProhibited => "clientRenewProhibited",
            StatusValue::ClientTransferProhibited => "clientTransferProhibited",
            StatusValue::ClientUpdateProhibited => "clientUpdateProhibited",
            StatusValue::Linked => "linked",
            StatusValue::PendingCreate => "pendingCreate",
            StatusValue::PendingDelete => "pendingDelete",
            StatusValue::PendingRenew => "pendingRenew",
            StatusValue::PendingTransfer => "pendingTransfer",
            StatusValue::PendingUpdate => "pendingUpdate",
            StatusValue::ServerDeleteProhibited => "serverDeleteProhibited",
            StatusValue::ServerHold => "serverHold",
            StatusValue::ServerRenewProhibited => "serverRenewProhibited",
            StatusValue::ServerTransferProhibited => "serverTransferProhibited",
            StatusValue::ServerUpdateProhibited => "serverUpdateProhibited",
        }
    }

    /// Whether adding or removing this status is billed to the registrar
    pub fn is_charged(self) -> bool {
        matches!(
            self,
            StatusValue::ServerDeleteProhibited
                | StatusValue::ServerHold
                | StatusValue::ServerRenewProhibited
                | StatusValue::ServerTransferProhibited
                | StatusValue::ServerUpdateProhibited
        )
    }

    /// Whether this status keeps the domain out of the published zone
    pub fn prohibits_publication(self) -> bool {
        matches!(
            self,
            StatusValue::ClientHold
                | StatusValue::ServerHold
                | StatusValue::PendingDelete
                | StatusValue::Inactive
        )
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for StatusValue {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusValue::ALL
            .into_iter()
            .find(|status| status.wire_name() == s)
            .ok_or_else(|| crate::Error::invalid_input(format!("Unknown status value: {}", s)))
    }
}

/// Statuses present in exactly one of the two sets
pub fn status_differences(
    existing: &BTreeSet<StatusValue>,
    updated: &BTreeSet<StatusValue>,
) -> BTreeSet<StatusValue> {
    existing.symmetric_difference(updated).copied().collect()
}
