//! Billing records and their construction
//!
//! - [`BillingEvent`]: A [`Charge`] or a [`Cancellation`]
//! - [`BillingEventFactory`]: Pure constructors for both

pub mod event;
pub mod factory;

pub use event::{
    BillingEvent, BillingEventId, BillingFlag, BillingReason, Cancellation, Charge,
    HistoryEntryId, Money,
};
pub use factory::{BillingEventFactory, ChargeBuilder, ChargeOverrides};
