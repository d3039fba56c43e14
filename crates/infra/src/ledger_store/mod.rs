//! Ledger store boundary.
//!
//! Holds, per product, the current aggregate snapshot and the append-only
//! sequence of change records that produced it, without making any storage
//! assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, StoreError, StoredChange};
