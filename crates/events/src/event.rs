use chrono::{DateTime, Utc};

use stockledger_core::ProductIdentifier;

/// A fact recorded against one product stream.
///
/// Implementors are immutable once built and are only ever appended.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stream the event belongs to.
    fn identifier(&self) -> &ProductIdentifier;

    /// Stable name, e.g. `"inventory.product.reserved"`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Business time.
    fn occurred_at(&self) -> DateTime<Utc>;
}
