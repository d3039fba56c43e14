use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockledger_core::ProductIdentifier;

use crate::event::Event;

/// A committed event together with its stream metadata.
///
/// This is the unit a ledger store appends. `sequence_number` starts at 1 and
/// grows by one per event within a single product stream; streams of
/// different products are numbered independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    identifier: ProductIdentifier,
    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    /// Position in the product stream, starting at 1.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn identifier(&self) -> &ProductIdentifier {
        &self.identifier
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, taking the stream key, type name, schema version and
    /// business time from the event.
    ///
    /// Uses a UUIDv7 so event ids sort by creation time.
    pub fn seal(sequence_number: u64, payload: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            identifier: payload.identifier().clone(),
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            occurred_at: payload.occurred_at(),
            sequence_number,
            payload,
        }
    }
}
