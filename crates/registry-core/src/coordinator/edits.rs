// # Update Requests
//
// The already-parsed form of a domain update: which values to add and remove.
// Authorization and protocol validation happen before a request gets here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

use crate::error::{Error, Result};
use crate::model::{DomainContact, DomainSnapshot, StatusValue};

/// A parsed domain update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Domain to update
    pub domain_name: String,
    /// Registrar submitting the update
    pub registrar_id: String,
    /// Whether a registry administrator requested the update
    #[serde(default)]
    pub administrator_initiated: bool,
    /// Requested edits
    #[serde(default)]
    pub edits: DomainEdits,
}

impl UpdateRequest {
    pub fn new(domain_name: impl Into<String>, registrar_id: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            registrar_id: registrar_id.into(),
            administrator_initiated: false,
            edits: DomainEdits::default(),
        }
    }

    /// Mark the request as administrator-initiated
    pub fn by_administrator(mut self) -> Self {
        self.administrator_initiated = true;
        self
    }

    /// Set the requested edits
    pub fn with_edits(mut self, edits: DomainEdits) -> Self {
        self.edits = edits;
        self
    }
}

/// Values to add to and remove from a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEdits {
    #[serde(default)]
    pub add_nameservers: BTreeSet<String>,
    #[serde(default)]
    pub remove_nameservers: BTreeSet<String>,
    #[serde(default)]
    pub add_statuses: BTreeSet<StatusValue>,
    #[serde(default)]
    pub remove_statuses: BTreeSet<StatusValue>,
    #[serde(default)]
    pub add_contacts: BTreeSet<DomainContact>,
    #[serde(default)]
    pub remove_contacts: BTreeSet<DomainContact>,
}

impl DomainEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_nameserver(mut self, host: impl Into<String>) -> Self {
        self.add_nameservers.insert(host.into());
        self
    }

    pub fn remove_nameserver(mut self, host: impl Into<String>) -> Self {
        self.remove_nameservers.insert(host.into());
        self
    }

    pub fn add_status(mut self, status: StatusValue) -> Self {
        self.add_statuses.insert(status);
        self
    }

    pub fn remove_status(mut self, status: StatusValue) -> Self {
        self.remove_statuses.insert(status);
        self
    }

    pub fn add_contact(mut self, contact: DomainContact) -> Self {
        self.add_contacts.insert(contact);
        self
    }

    pub fn remove_contact(mut self, contact: DomainContact) -> Self {
        self.remove_contacts.insert(contact);
        self
    }

    /// Whether the request changes nothing
    pub fn is_empty(&self) -> bool {
        self.add_nameservers.is_empty()
            && self.remove_nameservers.is_empty()
            && self.add_statuses.is_empty()
            && self.remove_statuses.is_empty()
            && self.add_contacts.is_empty()
            && self.remove_contacts.is_empty()
    }

    /// Reject a value that is both added and removed
    pub fn validate(&self) -> Result<()> {
        reject_overlap("nameserver", &self.add_nameservers, &self.remove_nameservers)?;
        reject_overlap("status", &self.add_statuses, &self.remove_statuses)?;
        reject_overlap("contact", &self.add_contacts, &self.remove_contacts)?;
        Ok(())
    }

    /// Apply the edits to a snapshot: removals first, then additions
    ///
    /// Grace periods are left untouched; they only change through
    /// reconciliation.
    pub fn apply(&self, snapshot: &DomainSnapshot) -> Result<DomainSnapshot> {
        self.validate()?;

        let mut updated = snapshot.clone();
        updated
            .nameservers
            .retain(|host| !self.remove_nameservers.contains(host));
        updated
            .statuses
            .retain(|status| !self.remove_statuses.contains(status));
        updated
            .contacts
            .retain(|contact| !self.remove_contacts.contains(contact));

        updated.nameservers.extend(self.add_nameservers.iter().cloned());
        updated.statuses.extend(self.add_statuses.iter().copied());
        updated.contacts.extend(self.add_contacts.iter().cloned());
        Ok(updated)
    }
}

fn reject_overlap<T: Ord + Display>(kind: &str, add: &BTreeSet<T>, remove: &BTreeSet<T>) -> Result<()> {
    match add.intersection(remove).next() {
        Some(value) => Err(Error::invalid_input(format!(
            "Cannot add and remove the same {} value: {}",
            kind, value
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContactRole;

    #[test]
    fn test_apply_removes_then_adds() {
        let domain = DomainSnapshot::new("example.app", "app", "TheRegistrar")
            .with_nameserver("ns1.old.net")
            .with_status(StatusValue::ClientHold)
            .with_contact(DomainContact::new(ContactRole::Tech, "tech-1"));

        let edits = DomainEdits::new()
            .remove_nameserver("ns1.old.net")
            .add_nameserver("ns1.new.net")
            .remove_status(StatusValue::ClientHold)
            .remove_contact(DomainContact::new(ContactRole::Tech, "tech-1"))
            .add_contact(DomainContact::new(ContactRole::Tech, "tech-2"));

        let updated = edits.apply(&domain).unwrap();

        assert_eq!(updated.nameservers, BTreeSet::from(["ns1.new.net".to_string()]));
        assert!(updated.statuses.is_empty());
        assert_eq!(
            updated.contacts,
            BTreeSet::from([DomainContact::new(ContactRole::Tech, "tech-2")])
        );
        assert_eq!(updated.grace_periods, domain.grace_periods);
    }

    #[test]
    fn test_add_and_remove_same_value_rejected() {
        let domain = DomainSnapshot::new("example.app", "app", "TheRegistrar");
        let edits = DomainEdits::new()
            .add_status(StatusValue::ServerHold)
            .remove_status(StatusValue::ServerHold);

        let err = edits.apply(&domain).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("serverHold"));
    }

    #[test]
    fn test_request_json_defaults() {
        let request: UpdateRequest = serde_json::from_str(
            r#"{ "domain_name": "example.app", "registrar_id": "TheRegistrar",
                 "edits": { "add_nameservers": ["ns1.example.net"] } }"#,
        )
        .unwrap();

        assert!(!request.administrator_initiated);
        assert!(request.edits.add_nameservers.contains("ns1.example.net"));
        assert!(request.edits.remove_statuses.is_empty());
    }
}
