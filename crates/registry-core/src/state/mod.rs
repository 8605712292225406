// # Entity Store Implementations
//
// This module provides implementations of the EntityStore trait for
// different persistence strategies.

pub mod file;
mod ledger;
pub mod memory;

pub use file::FileEntityStore;
pub use memory::MemoryEntityStore;
