//! Inventory ledger engine (application-level orchestration).
//!
//! Every mutating call runs the same pipeline:
//!
//! ```text
//! (identifier, quantity)
//!   ↓
//! 1. Load the product snapshot from the store (or start from an empty one)
//!   ↓
//! 2. Decide the change record (pure; validation happens here)
//!   ↓
//! 3. Apply it to a copy of the snapshot
//!   ↓
//! 4. Append snapshot + record to the store (optimistic version check)
//! ```
//!
//! A rejected call stops before step 4, so neither the snapshot nor the log
//! changes. History queries are answered from the stored records only.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use stockledger_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, ProductIdentifier};
use stockledger_inventory::{
    OperationKind, ProductChanges, ProductHistory, ProductStock, Quantities, StockCommand,
    StockOperation,
};

use crate::config::LedgerConfig;
use crate::ledger_store::{InMemoryLedgerStore, LedgerStore, StoreError, StoredChange};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Business rule rejection, passed through unchanged from the aggregate.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store refused or failed the write/read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored records do not reproduce the stored snapshot.
    #[error("ledger for {identifier} is corrupted: {reason}")]
    Corrupted {
        identifier: ProductIdentifier,
        reason: String,
    },
}

impl LedgerError {
    /// The domain error, if this is a business rule rejection.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-product inventory ledger over a [`LedgerStore`].
#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
    config: LedgerConfig,
    clock: fn() -> DateTime<Utc>,
}

impl InventoryLedger<InMemoryLedgerStore> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryLedgerStore::new())
    }
}

impl Default for InventoryLedger<InMemoryLedgerStore> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<S> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: LedgerConfig::default(),
            clock: Utc::now,
        }
    }

    /// Ledger over `store`, configured from the process environment.
    pub fn from_env(store: S) -> Self {
        Self::new(store).with_config(LedgerConfig::from_env_or_default())
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the source of `occurred_at` timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

}

impl<S: LedgerStore> InventoryLedger<S> {
    /// Register a new product with its initial store quantity.
    pub fn register_product(&self, identifier: &str, store_quantity: i64) -> Result<StoredChange, LedgerError> {
        self.dispatch(identifier, StockOperation::Register(store_quantity))
    }

    /// Set the store quantity to an absolute value.
    pub fn change_quantity(&self, identifier: &str, quantity: i64) -> Result<StoredChange, LedgerError> {
        self.dispatch(identifier, StockOperation::ChangeQuantity(quantity))
    }

    pub fn reserve_product(&self, identifier: &str, quantity: i64) -> Result<StoredChange, LedgerError> {
        self.dispatch(identifier, StockOperation::Reserve(quantity))
    }

    pub fn sell_product(&self, identifier: &str, quantity: i64) -> Result<StoredChange, LedgerError> {
        self.dispatch(identifier, StockOperation::Sell(quantity))
    }

    pub fn expire_product(&self, identifier: &str, quantity: i64) -> Result<StoredChange, LedgerError> {
        self.dispatch(identifier, StockOperation::Expire(quantity))
    }

    pub fn refund_product(&self, identifier: &str, quantity: i64) -> Result<StoredChange, LedgerError> {
        self.dispatch(identifier, StockOperation::Refund(quantity))
    }

    pub fn available_quantity(&self, identifier: &str) -> Result<i64, LedgerError> {
        Ok(self.snapshot(identifier)?.available_quantity())
    }

    pub fn reserved_quantity(&self, identifier: &str) -> Result<i64, LedgerError> {
        Ok(self.snapshot(identifier)?.reserved_quantity())
    }

    pub fn sold_quantity(&self, identifier: &str) -> Result<i64, LedgerError> {
        Ok(self.snapshot(identifier)?.sold_quantity())
    }

    pub fn store_quantity(&self, identifier: &str) -> Result<i64, LedgerError> {
        Ok(self.snapshot(identifier)?.store_quantity())
    }

    /// Current aggregate snapshot of a registered product.
    pub fn snapshot(&self, identifier: &str) -> Result<ProductStock, LedgerError> {
        let id = ProductIdentifier::parse(identifier)?;
        match self.store.load_snapshot(&id)? {
            Some(stock) => Ok(stock),
            None => Err(DomainError::unknown(id).into()),
        }
    }

    /// Running quantities after each operation, oldest first.
    pub fn product_history(&self, identifier: &str) -> Result<ProductHistory, LedgerError> {
        let stream = self.records(identifier)?;
        Ok(ProductHistory::from_records(stream.iter().map(StoredChange::payload)))
    }

    /// Per-operation signed deltas, oldest first.
    pub fn product_changes(&self, identifier: &str) -> Result<ProductChanges, LedgerError> {
        let stream = self.records(identifier)?;
        Ok(ProductChanges::from_records(stream.iter().map(StoredChange::payload)))
    }

    /// Committed change records of a registered product, in sequence order.
    pub fn records(&self, identifier: &str) -> Result<Vec<StoredChange>, LedgerError> {
        let id = ProductIdentifier::parse(identifier)?;
        let stream = self.store.load_stream(&id)?;
        if stream.is_empty() {
            return Err(DomainError::unknown(id).into());
        }
        Ok(stream)
    }

    /// All registered identifiers, in ascending order.
    pub fn identifiers(&self) -> Result<Vec<ProductIdentifier>, LedgerError> {
        Ok(self.store.identifiers()?)
    }

    /// Replay a product's records from zero and check they reproduce the
    /// stored snapshot. Both are read in one store call.
    #[instrument(level = "debug", skip(self))]
    pub fn verify(&self, identifier: &str) -> Result<ProductStock, LedgerError> {
        let id = ProductIdentifier::parse(identifier)?;
        let Some((snapshot, stream)) = self.store.load(&id)? else {
            return Err(DomainError::unknown(id).into());
        };
        let corrupted = |reason: String| LedgerError::Corrupted {
            identifier: id.clone(),
            reason,
        };

        let mut previous = Quantities::ZERO;
        for (idx, stored) in stream.iter().enumerate() {
            let expected_seq = idx as u64 + 1;
            if stored.sequence_number() != expected_seq {
                return Err(corrupted(format!(
                    "sequence number {} at position {expected_seq}",
                    stored.sequence_number()
                )));
            }
            let record = stored.payload();
            if record.identifier != id {
                return Err(corrupted(format!(
                    "record {expected_seq} belongs to {}",
                    record.identifier
                )));
            }
            if !record.is_consistent_with(&previous) {
                return Err(corrupted(format!(
                    "record {expected_seq} deltas do not lead to its resulting quantities"
                )));
            }
            previous = record.resulting;
        }

        let replayed = ProductStock::replay(id.clone(), stream.iter().map(StoredChange::payload));
        replayed.check_invariants().map_err(&corrupted)?;
        if replayed != snapshot {
            warn!(identifier = %id, "snapshot diverges from change log");
            return Err(corrupted(format!(
                "snapshot {:?} differs from replayed {:?}",
                snapshot.quantities(),
                replayed.quantities()
            )));
        }

        Ok(replayed)
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(identifier = %identifier, operation = %operation.kind(), quantity = operation.quantity())
    )]
    fn dispatch(&self, identifier: &str, operation: StockOperation) -> Result<StoredChange, LedgerError> {
        let id = ProductIdentifier::parse(identifier)?;

        // 1) Load current snapshot
        let current = self.store.load_snapshot(&id)?;
        let (stock, expected) = match current {
            Some(stock) => {
                let version = stock.version();
                (stock, ExpectedVersion::Exact(version))
            }
            None if operation.kind() != OperationKind::Register => {
                debug!("operation on unregistered product");
                return Err(DomainError::unknown(id).into());
            }
            None => (ProductStock::empty(id.clone()), ExpectedVersion::NoStream),
        };
        self.check_zero_movement(operation)?;

        // 2) + 3) Decide and evolve (no mutation of `stock` on failure)
        let command = StockCommand::new(id, operation).at((self.clock)());
        let (next, record) = stock.execute(&command).map_err(|e| {
            debug!(error = %e, "operation rejected");
            e
        })?;

        // 4) Persist snapshot + record together
        let committed = self.store.append(next, record, expected).map_err(|e| {
            warn!(error = %e, "append failed");
            e
        })?;

        info!(
            event_id = %committed.event_id(),
            sequence_number = committed.sequence_number(),
            event_type = committed.event_type(),
            "change recorded"
        );
        Ok(committed)
    }

    fn check_zero_movement(&self, operation: StockOperation) -> Result<(), DomainError> {
        if operation.quantity() == 0 && operation.kind().is_movement() && !self.config.allow_zero_movements {
            return Err(DomainError::invalid_quantity(format!(
                "{} quantity must be positive",
                operation.kind()
            )));
        }
        Ok(())
    }
}
