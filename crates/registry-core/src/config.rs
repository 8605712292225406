//! Configuration types for the registry update core
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::billing::Money;

/// Upper bound on the add grace period (ten years)
pub const MAX_ADD_GRACE_PERIOD_SECS: u64 = 10 * 366 * 24 * 60 * 60;

/// Main registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Per-tld pricing
    pub tlds: Vec<TldConfig>,

    /// Entity store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Optional coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl RegistryConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            tlds: Vec::new(),
            store: StoreConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }

    /// Add a tld
    pub fn with_tld(mut self, tld: TldConfig) -> Self {
        self.tlds.push(tld);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tlds.is_empty() {
            return Err(crate::Error::config("No tlds configured"));
        }

        let mut seen = HashSet::new();
        for tld in &self.tlds {
            tld.validate()?;
            if !seen.insert(tld.tld.as_str()) {
                return Err(crate::Error::config(format!(
                    "Tld '{}' is configured more than once",
                    tld.tld
                )));
            }
        }

        self.store.validate()?;

        if self.coordinator.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pricing and policy for one tld
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TldConfig {
    /// The tld, without a leading dot (e.g. "app")
    pub tld: String,

    /// Length of the standard add grace period (in seconds)
    #[serde(default = "default_add_grace_period_secs")]
    pub add_grace_period_secs: u64,

    /// Flat fee for an administrator changing charged statuses
    #[serde(default = "default_server_status_change_fee")]
    pub server_status_change_fee: Money,
}

impl TldConfig {
    /// Create a tld configuration with default pricing
    pub fn new(tld: impl Into<String>) -> Self {
        Self {
            tld: tld.into(),
            add_grace_period_secs: default_add_grace_period_secs(),
            server_status_change_fee: default_server_status_change_fee(),
        }
    }

    /// Set the add grace period length
    pub fn with_add_grace_period_secs(mut self, secs: u64) -> Self {
        self.add_grace_period_secs = secs;
        self
    }

    /// Set the status change fee
    pub fn with_server_status_change_fee(mut self, fee: Money) -> Self {
        self.server_status_change_fee = fee;
        self
    }

    /// Validate the tld configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tld.is_empty() || self.tld.starts_with('.') {
            return Err(crate::Error::config(format!(
                "Invalid tld name: '{}'",
                self.tld
            )));
        }
        if self.add_grace_period_secs == 0 {
            return Err(crate::Error::config(format!(
                "Add grace period for '{}' must be > 0",
                self.tld
            )));
        }
        if self.add_grace_period_secs > MAX_ADD_GRACE_PERIOD_SECS {
            return Err(crate::Error::config(format!(
                "Add grace period for '{}' must be at most {} seconds. Got: {}",
                self.tld, MAX_ADD_GRACE_PERIOD_SECS, self.add_grace_period_secs
            )));
        }
        let fee = &self.server_status_change_fee;
        if fee.currency.len() != 3 || !fee.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(crate::Error::config(format!(
                "Invalid currency code for '{}': '{}'",
                self.tld, fee.currency
            )));
        }
        if fee.amount_cents < 0 {
            return Err(crate::Error::config(format!(
                "Server status change fee for '{}' cannot be negative",
                self.tld
            )));
        }
        Ok(())
    }
}

/// Entity store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-backed ledger
    File {
        /// Path to the ledger file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("File store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Capacity of the monitoring event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_add_grace_period_secs() -> u64 {
    5 * 24 * 60 * 60
}

fn default_server_status_change_fee() -> Money {
    Money::usd(2000)
}

fn default_event_channel_capacity() -> usize {
    1000
}
