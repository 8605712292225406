//! Core traits for the registry update core
//!
//! This module defines the abstract interfaces of the update's collaborators.
//!
//! - [`EntityStore`]: Load snapshots and charges, commit updates atomically
//! - [`DnsRefreshQueue`]: Request republication of a domain
//! - [`Clock`]: Time of the update

pub mod clock;
pub mod dns_queue;
pub mod entity_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dns_queue::DnsRefreshQueue;
pub use entity_store::{CommitBatch, EntityStore};
