//! Infrastructure layer: ledger engine, ledger store, configuration.

pub mod config;
pub mod ledger;
pub mod ledger_store;

pub use config::{ConfigError, LedgerConfig};
pub use ledger::{InventoryLedger, LedgerError};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, StoreError, StoredChange};
