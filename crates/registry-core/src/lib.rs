// # registry-core
//
// Core library for domain update reconciliation.
//
// ## Architecture Overview
//
// When a domain update is committed, several side effects must be derived
// from the difference between the committed and the updated registration:
// - **GracePeriodReconciler**: converts an extended add grace period into a
//   standard add grace period once the domain becomes publishable
// - **StatusChangeBiller**: charges administrators for changing server statuses
// - **BillingEventFactory**: builds and derives charges and cancellations
// - **UpdateCoordinator**: loads, reconciles, commits and queues the DNS refresh
// - **EntityStore** / **DnsRefreshQueue**: traits for the I/O around an update
//
// ## Design Principles
//
// 1. **Pure Reconciliation**: Steps compute effects as data and never touch I/O
// 2. **Atomic Commits**: A snapshot and its billing events persist together or
//    not at all
// 3. **Library-First**: All core functionality can be used as a library

pub mod billing;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod pricing;
pub mod queue;
pub mod reconcile;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use billing::{BillingEvent, BillingEventFactory, Cancellation, Charge, Money};
pub use config::{RegistryConfig, StoreConfig, TldConfig};
pub use coordinator::{CoordinatorEvent, UpdateCoordinator, UpdateEffects, UpdateOutcome, UpdateRequest};
pub use error::{Error, Result};
pub use model::{DomainSnapshot, GracePeriod, GracePeriodKind, StatusValue};
pub use pricing::PricingRegistry;
pub use reconcile::{GracePeriodReconciler, ReconciliationPipeline, StatusChangeBiller};
pub use state::{FileEntityStore, MemoryEntityStore};
pub use traits::{Clock, DnsRefreshQueue, EntityStore};
