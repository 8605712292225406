// # Domain Snapshot
//
// One registration at a point in time. A snapshot is owned by the update
// that loaded it; edits and reconciliation produce new snapshots rather than
// mutating the committed one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::model::grace_period::{GracePeriod, GracePeriodKind};
use crate::model::status::StatusValue;

/// Role a contact plays for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactRole {
    Admin,
    Billing,
    Tech,
}

impl fmt::Display for ContactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContactRole::Admin => "admin",
            ContactRole::Billing => "billing",
            ContactRole::Tech => "tech",
        };
        f.write_str(name)
    }
}

/// A contact linked to a domain in a given role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainContact {
    pub role: ContactRole,
    pub contact_id: String,
}

impl DomainContact {
    pub fn new(role: ContactRole, contact_id: impl Into<String>) -> Self {
        Self {
            role,
            contact_id: contact_id.into(),
        }
    }
}

impl fmt::Display for DomainContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.contact_id)
    }
}

/// A domain registration at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    /// Fully-qualified domain name (e.g. "example.tld")
    pub fully_qualified_name: String,

    /// Registry-assigned repository id (ROID)
    #[serde(default)]
    pub repository_id: String,

    /// Top-level registry scope that prices this domain
    pub tld: String,

    /// Sponsoring registrar (client) id
    pub registrar_id: String,

    /// Status flags
    #[serde(default)]
    pub statuses: BTreeSet<StatusValue>,

    /// Delegated nameserver host names
    #[serde(default)]
    pub nameservers: BTreeSet<String>,

    /// Linked contacts
    #[serde(default)]
    pub contacts: BTreeSet<DomainContact>,

    /// Active grace periods, in the order they were granted
    #[serde(default)]
    pub grace_periods: Vec<GracePeriod>,
}

impl DomainSnapshot {
    /// Create a bare snapshot with no statuses, nameservers or grace periods
    pub fn new(
        fully_qualified_name: impl Into<String>,
        tld: impl Into<String>,
        registrar_id: impl Into<String>,
    ) -> Self {
        Self {
            fully_qualified_name: fully_qualified_name.into(),
            repository_id: String::new(),
            tld: tld.into(),
            registrar_id: registrar_id.into(),
            statuses: BTreeSet::new(),
            nameservers: BTreeSet::new(),
            contacts: BTreeSet::new(),
            grace_periods: Vec::new(),
        }
    }

    /// Set the repository id
    pub fn with_repository_id(mut self, repository_id: impl Into<String>) -> Self {
        self.repository_id = repository_id.into();
        self
    }

    /// Add a status flag
    pub fn with_status(mut self, status: StatusValue) -> Self {
        self.statuses.insert(status);
        self
    }

    /// Add a nameserver
    pub fn with_nameserver(mut self, host: impl Into<String>) -> Self {
        self.nameservers.insert(host.into());
        self
    }

    /// Link a contact
    pub fn with_contact(mut self, contact: DomainContact) -> Self {
        self.contacts.insert(contact);
        self
    }

    /// Attach a grace period
    pub fn with_grace_period(mut self, grace_period: GracePeriod) -> Self {
        self.grace_periods.push(grace_period);
        self
    }

    /// Whether the domain would actively resolve
    ///
    /// A domain is published when it is delegated to at least one nameserver
    /// and holds no status that keeps it out of the zone.
    pub fn should_publish_to_dns(&self) -> bool {
        !self.nameservers.is_empty()
            && !self.statuses.iter().any(|status| status.prohibits_publication())
    }

    /// The extended add grace period, if the domain holds one
    ///
    /// # Returns
    ///
    /// - `Ok(Some(GracePeriod))`: The single extended add grace period
    /// - `Ok(None)`: The domain holds none
    /// - `Err(Error::InvariantViolation)`: More than one is attached
    pub fn extended_add_grace_period(&self) -> Result<Option<&GracePeriod>> {
        let mut extended = self.grace_periods.iter().filter(|gp| gp.is_extended_add());
        let first = extended.next();
        if extended.next().is_some() {
            return Err(Error::invariant(format!(
                "Domain {} holds more than one {} grace period",
                self.fully_qualified_name,
                GracePeriodKind::ExtendedAdd
            )));
        }
        Ok(first)
    }

    /// Grace periods of the given kind
    pub fn grace_periods_of(&self, kind: GracePeriodKind) -> impl Iterator<Item = &GracePeriod> {
        self.grace_periods.iter().filter(move |gp| gp.kind == kind)
    }

    /// Attach a grace period
    pub fn add_grace_period(&mut self, grace_period: GracePeriod) {
        self.grace_periods.push(grace_period);
    }

    /// Detach a grace period
    ///
    /// # Returns
    ///
    /// `true` if the grace period was attached and has been removed
    pub fn remove_grace_period(&mut self, grace_period: &GracePeriod) -> bool {
        let before = self.grace_periods.len();
        self.grace_periods.retain(|gp| gp != grace_period);
        self.grace_periods.len() != before
    }

    /// Check the structural invariants of the snapshot
    pub fn validate(&self) -> Result<()> {
        if self.fully_qualified_name.is_empty() {
            return Err(Error::invalid_input("Domain name cannot be empty"));
        }
        if self.tld.is_empty() {
            return Err(Error::invalid_input(format!(
                "Domain {} has no tld",
                self.fully_qualified_name
            )));
        }
        self.extended_add_grace_period()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn domain() -> DomainSnapshot {
        DomainSnapshot::new("example.tld", "tld", "TheRegistrar")
    }

    #[test]
    fn test_publication_requires_nameserver() {
        assert!(!domain().should_publish_to_dns());
        assert!(domain().with_nameserver("ns1.example.net").should_publish_to_dns());
    }

    #[test]
    fn test_hold_statuses_block_publication() {
        for status in [
            StatusValue::ClientHold,
            StatusValue::ServerHold,
            StatusValue::PendingDelete,
            StatusValue::Inactive,
        ] {
            let snapshot = domain()
                .with_nameserver("ns1.example.net")
                .with_status(status);
            assert!(!snapshot.should_publish_to_dns(), "{} should block", status);
        }

        let locked = domain()
            .with_nameserver("ns1.example.net")
            .with_status(StatusValue::ServerUpdateProhibited);
        assert!(locked.should_publish_to_dns());
    }

    #[test]
    fn test_two_extended_add_grace_periods_violate_invariant() {
        let expiry = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let gp = GracePeriod::without_charge(GracePeriodKind::ExtendedAdd, expiry, "TheRegistrar");
        let snapshot = domain().with_grace_period(gp.clone()).with_grace_period(gp);

        let err = snapshot.extended_add_grace_period().unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_remove_grace_period() {
        let expiry = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let redemption =
            GracePeriod::without_charge(GracePeriodKind::Redemption, expiry, "TheRegistrar");
        let mut snapshot = domain().with_grace_period(redemption.clone());

        assert!(snapshot.remove_grace_period(&redemption));
        assert!(!snapshot.remove_grace_period(&redemption));
        assert!(snapshot.grace_periods.is_empty());
    }
}
