//! Domain registration model
//!
//! - [`DomainSnapshot`]: A registration at a point in time
//! - [`GracePeriod`]: Time-bounded rights attached to a domain
//! - [`StatusValue`]: Status flags and their billing/publication classes

pub mod domain;
pub mod grace_period;
pub mod status;

pub use domain::{ContactRole, DomainContact, DomainSnapshot};
pub use grace_period::{GracePeriod, GracePeriodKind};
pub use status::{StatusValue, status_differences};
