//! Lag/latency tracking between an event's creation, its publish to the bus,
//! and its processing by the projection engine (§4.6).
//!
//! `record_created` is inlined directly into `EventLogStore::save`'s
//! transaction rather than routed through this trait, since the CREATED row
//! must be inserted atomically alongside the event and outbox rows it
//! measures. `record_published`/`record_processed` are called by the
//! dispatcher and projection engine respectively, once each event actually
//! clears that stage.

use uuid::Uuid;

use crate::errors::CoreError;

pub trait LagTracker {
    /// Called by the dispatcher immediately after a successful publish.
    fn record_published(&self, event_id: Uuid) -> Result<(), CoreError>;

    /// Called by the projection engine immediately after an event is
    /// applied to the read views (not on an idempotent no-op replay).
    fn record_processed(&self, event_id: Uuid) -> Result<(), CoreError>;
}

/// In-memory `LagTracker`, for tests and single-process demos. Records only
/// which event ids reached each stage — it has no timestamps to compute
/// latency from, since nothing in this crate's tests needs that.
#[derive(Default)]
pub struct InMemoryLagTracker {
    published: std::sync::Mutex<std::collections::HashSet<Uuid>>,
    processed: std::sync::Mutex<std::collections::HashSet<Uuid>>,
}

impl InMemoryLagTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_published(&self, event_id: Uuid) -> bool {
        self.published.lock().expect("lag mutex poisoned").contains(&event_id)
    }

    pub fn was_processed(&self, event_id: Uuid) -> bool {
        self.processed.lock().expect("lag mutex poisoned").contains(&event_id)
    }
}

impl LagTracker for InMemoryLagTracker {
    fn record_published(&self, event_id: Uuid) -> Result<(), CoreError> {
        self.published.lock().expect("lag mutex poisoned").insert(event_id);
        Ok(())
    }

    fn record_processed(&self, event_id: Uuid) -> Result<(), CoreError> {
        self.processed.lock().expect("lag mutex poisoned").insert(event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_queryable_per_event() {
        let tracker = InMemoryLagTracker::new();
        let id = Uuid::new_v4();
        assert!(!tracker.was_published(id));

        tracker.record_published(id).unwrap();
        assert!(tracker.was_published(id));
        assert!(!tracker.was_processed(id));

        tracker.record_processed(id).unwrap();
        assert!(tracker.was_processed(id));
    }
}
