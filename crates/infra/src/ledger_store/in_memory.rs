use std::collections::HashMap;
use std::sync::RwLock;

use stockledger_core::{AggregateRoot, ExpectedVersion, ProductIdentifier};
use stockledger_inventory::{ProductStock, QuantityChanged};

use super::r#trait::{LedgerStore, StoreError, StoredChange};

#[derive(Debug)]
struct ProductEntry {
    snapshot: ProductStock,
    stream: Vec<StoredChange>,
}

impl ProductEntry {
    fn current_version(&self) -> u64 {
        self.stream.last().map(|e| e.sequence_number()).unwrap_or(0)
    }
}

/// In-memory ledger store.
///
/// One writer at a time across all products; readers share the lock.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    products: RwLock<HashMap<ProductIdentifier, ProductEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(
        &self,
        snapshot: ProductStock,
        record: QuantityChanged,
        expected_version: ExpectedVersion,
    ) -> Result<StoredChange, StoreError> {
        if record.identifier != *snapshot.id() {
            return Err(StoreError::InvalidAppend(format!(
                "record for {} paired with snapshot of {}",
                record.identifier,
                snapshot.id()
            )));
        }

        let mut products = self.products.write().map_err(|_| StoreError::Poisoned)?;

        let current = products.get(&record.identifier).map(ProductEntry::current_version);
        if !expected_version.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current:?}"
            )));
        }

        let next = current.unwrap_or(0) + 1;
        if snapshot.version() != next {
            return Err(StoreError::InvalidAppend(format!(
                "snapshot version {} does not follow stream version {}",
                snapshot.version(),
                next - 1
            )));
        }

        let stored = StoredChange::seal(next, record);
        match products.get_mut(stored.identifier()) {
            Some(entry) => {
                entry.snapshot = snapshot;
                entry.stream.push(stored.clone());
            }
            None => {
                products.insert(
                    stored.identifier().clone(),
                    ProductEntry {
                        snapshot,
                        stream: vec![stored.clone()],
                    },
                );
            }
        }

        Ok(stored)
    }

    fn load_snapshot(&self, identifier: &ProductIdentifier) -> Result<Option<ProductStock>, StoreError> {
        let products = self.products.read().map_err(|_| StoreError::Poisoned)?;
        Ok(products.get(identifier).map(|e| e.snapshot.clone()))
    }

    fn load_stream(&self, identifier: &ProductIdentifier) -> Result<Vec<StoredChange>, StoreError> {
        let products = self.products.read().map_err(|_| StoreError::Poisoned)?;
        Ok(products
            .get(identifier)
            .map(|e| e.stream.clone())
            .unwrap_or_default())
    }

    fn load(&self, identifier: &ProductIdentifier) -> Result<Option<(ProductStock, Vec<StoredChange>)>, StoreError> {
        let products = self.products.read().map_err(|_| StoreError::Poisoned)?;
        Ok(products
            .get(identifier)
            .map(|e| (e.snapshot.clone(), e.stream.clone())))
    }

    fn identifiers(&self) -> Result<Vec<ProductIdentifier>, StoreError> {
        let products = self.products.read().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<_> = products.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
