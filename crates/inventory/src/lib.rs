//! Inventory quantity domain (event-sourced).
//!
//! Business rules for per-product stock buckets, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod change;
pub mod history;
pub mod product;

pub use change::{OperationKind, Quantities, QuantityChanged, QuantityDeltas};
pub use history::{ProductChanges, ProductHistory};
pub use product::{ProductStock, StockCommand, StockOperation};
