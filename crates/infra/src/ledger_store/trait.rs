use std::sync::Arc;

use thiserror::Error;

use stockledger_core::{ExpectedVersion, ProductIdentifier};
use stockledger_events::EventEnvelope;
use stockledger_inventory::{ProductStock, QuantityChanged};

/// A change record as committed to a product stream (with its sequence number).
pub type StoredChange = EventEnvelope<QuantityChanged>;

/// Ledger store operation error.
///
/// These are **infrastructure errors** (concurrency, malformed appends, lock
/// failures) as opposed to domain errors (quantity rules).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("ledger store lock poisoned")]
    Poisoned,
}

/// Per-product store of the current snapshot plus its append-only change log.
///
/// This is the seam a persistence adapter implements: `append` is the write
/// path (one snapshot + one record, atomically), the `load_*` methods are the
/// query path.
///
/// ## Append Semantics
///
/// `append()`:
/// - requires `record.identifier` and the snapshot id to match
/// - checks `expected_version` against the current stream length
///   (`None` when the product has no stream yet)
/// - requires the snapshot version to be the new stream length
/// - assigns the next sequence number (1-based, no gaps)
/// - replaces the snapshot and appends the record, or does neither
///
/// ## Load Semantics
///
/// Records come back in sequence order. An unknown product yields `None` /
/// an empty vector, never an error. `load` returns snapshot and stream as of
/// the same instant; separate `load_snapshot` + `load_stream` calls may see
/// an append in between.
pub trait LedgerStore: Send + Sync {
    fn append(
        &self,
        snapshot: ProductStock,
        record: QuantityChanged,
        expected_version: ExpectedVersion,
    ) -> Result<StoredChange, StoreError>;

    fn load_snapshot(&self, identifier: &ProductIdentifier) -> Result<Option<ProductStock>, StoreError>;

    fn load_stream(&self, identifier: &ProductIdentifier) -> Result<Vec<StoredChange>, StoreError>;

    /// Snapshot and stream read together, or `None` for an unknown product.
    fn load(&self, identifier: &ProductIdentifier) -> Result<Option<(ProductStock, Vec<StoredChange>)>, StoreError>;

    /// All identifiers with a stream, in ascending order.
    fn identifiers(&self) -> Result<Vec<ProductIdentifier>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(
        &self,
        snapshot: ProductStock,
        record: QuantityChanged,
        expected_version: ExpectedVersion,
    ) -> Result<StoredChange, StoreError> {
        (**self).append(snapshot, record, expected_version)
    }

    fn load_snapshot(&self, identifier: &ProductIdentifier) -> Result<Option<ProductStock>, StoreError> {
        (**self).load_snapshot(identifier)
    }

    fn load_stream(&self, identifier: &ProductIdentifier) -> Result<Vec<StoredChange>, StoreError> {
        (**self).load_stream(identifier)
    }

    fn load(&self, identifier: &ProductIdentifier) -> Result<Option<(ProductStock, Vec<StoredChange>)>, StoreError> {
        (**self).load(identifier)
    }

    fn identifiers(&self) -> Result<Vec<ProductIdentifier>, StoreError> {
        (**self).identifiers()
    }
}
