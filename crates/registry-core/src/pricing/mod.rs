//! Per-tld pricing lookup
//!
//! The registry maps a tld to the pricing that governs updates of domains
//! under it. Lookups happen once per update, in the coordinator; the resolved
//! [`TldPricing`] is then passed explicitly to every reconciliation step.
//!
//! ## Usage
//!
//! ```rust
//! use registry_core::config::{RegistryConfig, TldConfig};
//! use registry_core::pricing::PricingRegistry;
//!
//! let config = RegistryConfig::new().with_tld(TldConfig::new("app"));
//! let registry = PricingRegistry::from_config(&config).unwrap();
//!
//! assert!(registry.pricing_for("app").is_ok());
//! assert!(registry.pricing_for("dev").is_err());
//! ```

use crate::billing::Money;
use crate::config::{RegistryConfig, TldConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Pricing inputs for one tld
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TldPricing {
    /// Length of the standard add grace period
    pub add_grace_period_length: chrono::Duration,
    /// Flat fee for an administrator changing charged statuses
    pub server_status_change_fee: Money,
}

impl TldPricing {
    pub fn new(add_grace_period_length: chrono::Duration, server_status_change_fee: Money) -> Self {
        Self {
            add_grace_period_length,
            server_status_change_fee,
        }
    }
}

impl TryFrom<&TldConfig> for TldPricing {
    type Error = Error;

    fn try_from(config: &TldConfig) -> Result<Self> {
        config.validate()?;
        let length = i64::try_from(config.add_grace_period_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| Error::config(format!("Add grace period for '{}' is out of range", config.tld)))?;
        Ok(Self::new(length, config.server_status_change_fee.clone()))
    }
}

/// Tld pricing registry
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes, so pricing can be replaced while the
/// coordinator is serving updates.
#[derive(Debug, Default)]
pub struct PricingRegistry {
    tlds: RwLock<HashMap<String, TldPricing>>,
}

impl PricingRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every tld in the configuration
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let registry = Self::new();
        for tld in &config.tlds {
            registry.register(tld.tld.clone(), TldPricing::try_from(tld)?);
        }
        Ok(registry)
    }

    /// Register (or replace) the pricing of a tld
    ///
    /// # Parameters
    ///
    /// - `tld`: Tld name (e.g., "app", "dev")
    /// - `pricing`: Pricing inputs for that tld
    pub fn register(&self, tld: impl Into<String>, pricing: TldPricing) {
        let mut tlds = self.tlds.write().unwrap_or_else(PoisonError::into_inner);
        tlds.insert(tld.into(), pricing);
    }

    /// Look up the pricing of a tld
    ///
    /// # Returns
    ///
    /// - `Ok(TldPricing)`: The registered pricing
    /// - `Err(Error::Config)`: The tld has no pricing; updates under it must
    ///   be rejected before anything is persisted
    pub fn pricing_for(&self, tld: &str) -> Result<TldPricing> {
        let tlds = self.tlds.read().unwrap_or_else(PoisonError::into_inner);
        tlds.get(tld)
            .cloned()
            .ok_or_else(|| Error::config(format!("No pricing configured for tld: {}", tld)))
    }

    /// List all registered tlds
    pub fn list_tlds(&self) -> Vec<String> {
        let tlds = self.tlds.read().unwrap_or_else(PoisonError::into_inner);
        tlds.keys().cloned().collect()
    }

    /// Check if a tld is registered
    pub fn has_tld(&self, tld: &str) -> bool {
        let tlds = self.tlds.read().unwrap_or_else(PoisonError::into_inner);
        tlds.contains_key(tld)
    }
}
