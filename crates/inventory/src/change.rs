//! Change records: one immutable fact per successful stock operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::ProductIdentifier;
use stockledger_events::Event;

/// The three tracked buckets of a product, as they stand after an operation.
///
/// Store quantity is never kept separately here; it is always the sum of the
/// three buckets.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantities {
    pub available_quantity: i64,
    pub reserved_quantity: i64,
    pub sold_quantity: i64,
}

impl Quantities {
    pub const ZERO: Self = Self {
        available_quantity: 0,
        reserved_quantity: 0,
        sold_quantity: 0,
    };

    pub fn store_quantity(&self) -> i64 {
        self.available_quantity + self.reserved_quantity + self.sold_quantity
    }

    /// Quantities after adding `deltas` to every bucket.
    pub fn apply(self, deltas: QuantityDeltas) -> Self {
        Self {
            available_quantity: self.available_quantity + deltas.available_quantity,
            reserved_quantity: self.reserved_quantity + deltas.reserved_quantity,
            sold_quantity: self.sold_quantity + deltas.sold_quantity,
        }
    }

    pub fn is_non_negative(&self) -> bool {
        self.available_quantity >= 0 && self.reserved_quantity >= 0 && self.sold_quantity >= 0
    }
}

/// Signed change applied to each bucket by a single operation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantityDeltas {
    pub available_quantity: i64,
    pub reserved_quantity: i64,
    pub sold_quantity: i64,
}

impl QuantityDeltas {
    pub fn new(available_quantity: i64, reserved_quantity: i64, sold_quantity: i64) -> Self {
        Self {
            available_quantity,
            reserved_quantity,
            sold_quantity,
        }
    }

    /// Net change of the store quantity. Zero for movements between buckets.
    pub fn store_delta(&self) -> i64 {
        self.available_quantity + self.reserved_quantity + self.sold_quantity
    }
}

/// Which operation produced a change record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Register,
    ChangeQuantity,
    Reserve,
    Sell,
    Expire,
    Refund,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Register,
        OperationKind::ChangeQuantity,
        OperationKind::Reserve,
        OperationKind::Sell,
        OperationKind::Expire,
        OperationKind::Refund,
    ];

    pub fn event_type(self) -> &'static str {
        match self {
            OperationKind::Register => "inventory.product.registered",
            OperationKind::ChangeQuantity => "inventory.product.quantity_changed",
            OperationKind::Reserve => "inventory.product.reserved",
            OperationKind::Sell => "inventory.product.sold",
            OperationKind::Expire => "inventory.product.expired",
            OperationKind::Refund => "inventory.product.refunded",
        }
    }

    /// Whether the operation only moves units between buckets (store unchanged).
    pub fn is_movement(self) -> bool {
        !matches!(self, OperationKind::Register | OperationKind::ChangeQuantity)
    }
}

impl core::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            OperationKind::Register => "register",
            OperationKind::ChangeQuantity => "change_quantity",
            OperationKind::Reserve => "reserve",
            OperationKind::Sell => "sell",
            OperationKind::Expire => "expire",
            OperationKind::Refund => "refund",
        };
        f.write_str(name)
    }
}

/// Event: QuantityChanged.
///
/// Captures the resulting quantities after one operation and the delta that
/// operation applied. `quantity` is the argument the caller passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityChanged {
    pub identifier: ProductIdentifier,
    pub operation: OperationKind,
    pub quantity: i64,
    pub resulting: Quantities,
    pub deltas: QuantityDeltas,
    pub occurred_at: DateTime<Utc>,
}

impl QuantityChanged {
    /// Schema version of the serialized record.
    pub const SCHEMA_VERSION: u32 = 1;

    /// True if `previous` plus this record's deltas gives its resulting quantities.
    pub fn is_consistent_with(&self, previous: &Quantities) -> bool {
        previous.apply(self.deltas) == self.resulting
    }
}

impl Event for QuantityChanged {
    fn identifier(&self) -> &ProductIdentifier {
        &self.identifier
    }

    fn event_type(&self) -> &'static str {
        self.operation.event_type()
    }

    fn version(&self) -> u32 {
        Self::SCHEMA_VERSION
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
