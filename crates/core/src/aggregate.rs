//! Aggregate root trait for event-sourced domain models.

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Number of events applied to this aggregate (the stream revision).
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require that the stream does not exist yet.
    NoStream,
    /// Require the stream to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `actual` is `None` when the stream does not exist.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual.is_none(),
            ExpectedVersion::Exact(v) => actual == Some(v),
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns the single event the
///   command produces, or the reason it was rejected.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. `handle` must validate everything before
/// an event is returned so that a rejected command leaves no trace.
pub trait Aggregate: AggregateRoot + Clone {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event (+1 version).
    fn apply(&mut self, event: &Self::Event);

    /// Decide which event a command produces. Must not mutate state.
    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error>;

    /// Functional update: decide, then return the evolved copy with the event.
    fn execute(&self, command: &Self::Command) -> Result<(Self, Self::Event), Self::Error> {
        let event = self.handle(command)?;
        let mut next = self.clone();
        next.apply(&event);
        Ok((next, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_version_matching() {
        assert!(ExpectedVersion::Any.matches(None));
        assert!(ExpectedVersion::Any.matches(Some(7)));
        assert!(ExpectedVersion::NoStream.matches(None));
        assert!(!ExpectedVersion::NoStream.matches(Some(1)));
        assert!(ExpectedVersion::Exact(3).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(3).matches(Some(4)));
        assert!(!ExpectedVersion::Exact(0).matches(None));
    }
}
