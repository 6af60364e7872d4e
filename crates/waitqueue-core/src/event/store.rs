//! Append-only event log, keyed by `(aggregate_id, version)`.
//!
//! - `save` appends the aggregate's pending events in one call and enforces
//!   optimistic concurrency: the caller's `expected_version` must equal the
//!   current length of the aggregate's event stream, or the save is rejected
//!   with `CoreError::ConcurrencyConflict` (§4.2).
//! - `load` returns the full ordered history for an aggregate so it can be
//!   folded (replayed) into state.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::errors::CoreError;

use super::types::{DomainEvent, EventKind, EventMetadata, PendingEvent};

/// Append-only per-aggregate event log.
pub trait EventLogStore<K: EventKind> {
    /// Returns the full history for `aggregate_id` in ascending version
    /// order. Empty if the aggregate has never been saved.
    fn load(&self, aggregate_id: &str) -> Result<Vec<DomainEvent<K>>, CoreError>;

    /// Appends `pending` to `aggregate_id`'s stream, assuming its current
    /// length is `expected_version`. Assigns `version`, `event_id`,
    /// `occurred_at` and `idempotency_key` to each event as it is appended.
    fn save(
        &self,
        aggregate_id: &str,
        expected_version: u64,
        pending: Vec<PendingEvent<K>>,
    ) -> Result<Vec<DomainEvent<K>>, CoreError>;

    /// Every event across every aggregate, in a total ordering consistent
    /// with each aggregate's own version order (a monotonic global
    /// sequence). Used by projection rebuild (§4.5).
    fn stream_all(&self) -> Result<Vec<DomainEvent<K>>, CoreError>;
}

/// In-memory `EventLogStore`, for tests and single-process demos.
pub struct InMemoryEventLogStore<K: EventKind> {
    inner: std::sync::Mutex<InMemoryState<K>>,
}

struct InMemoryState<K: EventKind> {
    by_aggregate: HashMap<String, Vec<DomainEvent<K>>>,
    /// Append order across all aggregates; since `save` holds the single
    /// mutex for the whole mutation, this order is always consistent with
    /// each aggregate's own version order.
    all: Vec<DomainEvent<K>>,
}

impl<K: EventKind> InMemoryEventLogStore<K> {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(InMemoryState {
                by_aggregate: HashMap::new(),
                all: Vec::new(),
            }),
        }
    }
}

impl<K: EventKind> Default for InMemoryEventLogStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EventKind> EventLogStore<K> for InMemoryEventLogStore<K> {
    fn load(&self, aggregate_id: &str) -> Result<Vec<DomainEvent<K>>, CoreError> {
        let guard = self.inner.lock().expect("event log mutex poisoned");
        Ok(guard.by_aggregate.get(aggregate_id).cloned().unwrap_or_default())
    }

    fn save(
        &self,
        aggregate_id: &str,
        expected_version: u64,
        pending: Vec<PendingEvent<K>>,
    ) -> Result<Vec<DomainEvent<K>>, CoreError> {
        let mut guard = self.inner.lock().expect("event log mutex poisoned");
        let stream = guard.by_aggregate.entry(aggregate_id.to_string()).or_default();

        let found = stream.len() as u64;
        if found != expected_version {
            return Err(CoreError::ConcurrencyConflict {
                expected: expected_version,
                found,
            });
        }

        let mut appended = Vec::with_capacity(pending.len());
        for (offset, pending_event) in pending.into_iter().enumerate() {
            let version = expected_version + offset as u64 + 1;
            let metadata = EventMetadata {
                event_id: Uuid::new_v4(),
                aggregate_id: aggregate_id.to_string(),
                version,
                correlation_id: pending_event.correlation_id,
                causation_id: pending_event.causation_id,
                actor: pending_event.actor,
                occurred_at: Utc::now(),
                idempotency_key: Uuid::new_v4(),
                schema_version: 1,
            };
            let event = DomainEvent {
                kind: pending_event.kind,
                metadata,
            };
            stream.push(event.clone());
            appended.push(event);
        }
        guard.all.extend(appended.iter().cloned());
        Ok(appended)
    }

    fn stream_all(&self) -> Result<Vec<DomainEvent<K>>, CoreError> {
        let guard = self.inner.lock().expect("event log mutex poisoned");
        Ok(guard.all.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Created,
        Renamed { to: String },
    }

    impl EventKind for TestEvent {
        fn event_name(&self) -> &'static str {
            match self {
                TestEvent::Created => "created",
                TestEvent::Renamed { .. } => "renamed",
            }
        }
    }

    fn pending(kind: TestEvent) -> PendingEvent<TestEvent> {
        PendingEvent::new(kind, Uuid::new_v4(), Uuid::new_v4(), "tester")
    }

    #[test]
    fn save_assigns_increasing_versions() {
        let store: InMemoryEventLogStore<TestEvent> = InMemoryEventLogStore::new();
        let saved = store
            .save("agg-1", 0, vec![pending(TestEvent::Created)])
            .unwrap();
        assert_eq!(saved[0].metadata.version, 1);

        let saved = store
            .save(
                "agg-1",
                1,
                vec![pending(TestEvent::Renamed { to: "x".into() })],
            )
            .unwrap();
        assert_eq!(saved[0].metadata.version, 2);

        assert_eq!(store.load("agg-1").unwrap().len(), 2);
    }

    #[test]
    fn save_rejects_stale_expected_version() {
        let store: InMemoryEventLogStore<TestEvent> = InMemoryEventLogStore::new();
        store
            .save("agg-1", 0, vec![pending(TestEvent::Created)])
            .unwrap();

        let err = store
            .save("agg-1", 0, vec![pending(TestEvent::Created)])
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::ConcurrencyConflict {
                expected: 0,
                found: 1,
            }
        );
    }

    #[test]
    fn stream_all_preserves_append_order_across_aggregates() {
        let store: InMemoryEventLogStore<TestEvent> = InMemoryEventLogStore::new();
        store.save("agg-1", 0, vec![pending(TestEvent::Created)]).unwrap();
        store.save("agg-2", 0, vec![pending(TestEvent::Created)]).unwrap();
        store
            .save("agg-1", 1, vec![pending(TestEvent::Renamed { to: "x".into() })])
            .unwrap();

        let all = store.stream_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].metadata.aggregate_id, "agg-1");
        assert_eq!(all[1].metadata.aggregate_id, "agg-2");
        assert_eq!(all[2].metadata.aggregate_id, "agg-1");
    }
}
