//! Time-series views over a product's change records.
//!
//! Both views are built from the records alone, never from the current
//! snapshot, so they are exact replays of what happened.

use serde::{Deserialize, Serialize};

use crate::change::{Quantities, QuantityChanged, QuantityDeltas};

/// Wire shape shared by both views; lengths are checked before it becomes one.
#[derive(Deserialize)]
struct ParallelColumns {
    available_quantity: Vec<i64>,
    reserved_quantity: Vec<i64>,
    sold_quantity: Vec<i64>,
}

impl ParallelColumns {
    fn check_lengths(&self) -> Result<(), String> {
        let available = self.available_quantity.len();
        let reserved = self.reserved_quantity.len();
        let sold = self.sold_quantity.len();
        if available != reserved || available != sold {
            return Err(format!(
                "columns differ in length: available {available}, reserved {reserved}, sold {sold}"
            ));
        }
        Ok(())
    }
}

/// Running quantities after each operation, oldest first.
///
/// The three sequences are parallel and have one entry per change record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ParallelColumns")]
pub struct ProductHistory {
    pub available_quantity: Vec<i64>,
    pub reserved_quantity: Vec<i64>,
    pub sold_quantity: Vec<i64>,
}

impl TryFrom<ParallelColumns> for ProductHistory {
    type Error = String;

    fn try_from(columns: ParallelColumns) -> Result<Self, Self::Error> {
        columns.check_lengths()?;
        Ok(Self {
            available_quantity: columns.available_quantity,
            reserved_quantity: columns.reserved_quantity,
            sold_quantity: columns.sold_quantity,
        })
    }
}

impl ProductHistory {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a QuantityChanged>) -> Self {
        let mut history = Self::default();
        for record in records {
            history.push(record.resulting);
        }
        history
    }

    pub fn push(&mut self, quantities: Quantities) {
        self.available_quantity.push(quantities.available_quantity);
        self.reserved_quantity.push(quantities.reserved_quantity);
        self.sold_quantity.push(quantities.sold_quantity);
    }

    pub fn len(&self) -> usize {
        self.available_quantity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available_quantity.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Quantities> {
        Some(Quantities {
            available_quantity: *self.available_quantity.get(index)?,
            reserved_quantity: *self.reserved_quantity.get(index)?,
            sold_quantity: *self.sold_quantity.get(index)?,
        })
    }

    pub fn last(&self) -> Option<Quantities> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }
}

/// Signed per-operation deltas, oldest first. Same length and order as
/// [`ProductHistory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ParallelColumns")]
pub struct ProductChanges {
    pub available_quantity: Vec<i64>,
    pub reserved_quantity: Vec<i64>,
    pub sold_quantity: Vec<i64>,
}

impl TryFrom<ParallelColumns> for ProductChanges {
    type Error = String;

    fn try_from(columns: ParallelColumns) -> Result<Self, Self::Error> {
        columns.check_lengths()?;
        Ok(Self {
            available_quantity: columns.available_quantity,
            reserved_quantity: columns.reserved_quantity,
            sold_quantity: columns.sold_quantity,
        })
    }
}

impl ProductChanges {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a QuantityChanged>) -> Self {
        let mut changes = Self::default();
        for record in records {
            changes.push(record.deltas);
        }
        changes
    }

    pub fn push(&mut self, deltas: QuantityDeltas) {
        self.available_quantity.push(deltas.available_quantity);
        self.reserved_quantity.push(deltas.reserved_quantity);
        self.sold_quantity.push(deltas.sold_quantity);
    }

    pub fn len(&self) -> usize {
        self.available_quantity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available_quantity.is_empty()
    }

    /// Prefix sums of the deltas. For a consistent log this equals the
    /// [`ProductHistory`] built from the same records.
    ///
    /// Columns are walked in lockstep; if the public fields were edited to
    /// different lengths, the sums stop at the shortest one.
    pub fn running_totals(&self) -> ProductHistory {
        let mut totals = ProductHistory::default();
        let mut current = Quantities::ZERO;
        let rows = self
            .available_quantity
            .iter()
            .zip(&self.reserved_quantity)
            .zip(&self.sold_quantity);
        for ((&available, &reserved), &sold) in rows {
            current = current.apply(QuantityDeltas::new(available, reserved, sold));
            totals.push(current);
        }
        totals
    }
}
