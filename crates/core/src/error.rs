//! Domain error model.

use thiserror::Error;

use crate::id::ProductIdentifier;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (quantity
/// rules, unknown or duplicate products, malformed input). Storage concerns
/// belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested quantity exceeds the pool the operation draws from
    /// (reserve beyond available, sell/expire beyond reserved, refund beyond sold).
    #[error("quantity too big: requested {requested}, at most {limit} allowed")]
    QuantityTooBig { requested: i64, limit: i64 },

    /// A store quantity adjustment would drop below reserved + sold units.
    #[error("quantity too low: requested {requested}, at least {minimum} required")]
    QuantityTooLow { requested: i64, minimum: i64 },

    /// The identifier was never registered.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductIdentifier),

    /// The identifier is already registered.
    #[error("product already registered: {0}")]
    AlreadyRegistered(ProductIdentifier),

    /// A quantity argument was out of range for the operation (e.g. negative).
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A domain invariant was violated (e.g. a command routed to the wrong aggregate).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. blank).
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl DomainError {
    pub fn too_big(requested: i64, limit: i64) -> Self {
        Self::QuantityTooBig { requested, limit }
    }

    pub fn too_low(requested: i64, minimum: i64) -> Self {
        Self::QuantityTooLow { requested, minimum }
    }

    pub fn unknown(id: ProductIdentifier) -> Self {
        Self::UnknownProduct(id)
    }

    pub fn already_registered(id: ProductIdentifier) -> Self {
        Self::AlreadyRegistered(id)
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }
}
