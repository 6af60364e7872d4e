//! Generic aggregate load/fold/save runtime.
//!
//! An `Aggregate` folds its own event stream into state (`fold`, used for
//! replay and for projection rebuild) and records new events as they're
//! produced by command handling (`apply`, used during a live command). The
//! free functions `load_aggregate`/`save_aggregate` wire an `Aggregate` to an
//! `EventLogStore` the same way a command handler needs to: load history,
//! replay it, mutate, then persist only what's new under an optimistic
//! concurrency check.

use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::event::{DomainEvent, EventKind, EventLogStore, PendingEvent};

/// Implemented by the concrete per-domain aggregate (e.g. `WaitingQueue`).
pub trait Aggregate {
    type Event: EventKind;

    /// A blank instance scoped to `aggregate_id`, ready to have history
    /// folded onto it via `apply`.
    fn new_blank(aggregate_id: &str) -> Self;

    /// Aggregate id this instance was loaded/constructed for.
    fn aggregate_id(&self) -> &str;

    /// Current version: the number of events applied so far.
    fn version(&self) -> u64;

    /// Applies a single historical event to mutate state. Used both by
    /// `fold` (replay) and by live command handling, so it must be a pure
    /// function of `(state, event, occurred_at)` with no side effects of its
    /// own — `occurred_at` is passed in rather than read from the clock so
    /// replay is deterministic (§8).
    fn apply(&mut self, event: &Self::Event, occurred_at: DateTime<Utc>);

    /// Events produced by the in-progress command, not yet persisted.
    fn uncommitted(&self) -> &[PendingEvent<Self::Event>];

    /// Drains and returns the events produced by the in-progress command.
    fn take_uncommitted(&mut self) -> Vec<PendingEvent<Self::Event>>;
}

/// Replays `history` from a blank instance scoped to `aggregate_id`. Pure
/// and deterministic: folding the same history twice always yields equal
/// state (§8).
pub fn fold<A: Aggregate>(aggregate_id: &str, history: &[DomainEvent<A::Event>]) -> A {
    let mut state = A::new_blank(aggregate_id);
    for event in history {
        state.apply(&event.kind, event.metadata.occurred_at);
    }
    debug_assert_eq!(state.version(), history.len() as u64);
    state
}

/// Loads an aggregate's full history from `store` and folds it into state.
pub fn load_aggregate<A, S>(store: &S, aggregate_id: &str) -> Result<A, CoreError>
where
    A: Aggregate,
    S: EventLogStore<A::Event>,
{
    let history = store.load(aggregate_id)?;
    Ok(fold::<A>(aggregate_id, &history))
}

/// Persists an aggregate's uncommitted events, assuming its pre-command
/// version was `aggregate.version() - pending.len()` (i.e. `apply` already
/// advanced the in-memory version counter as each pending event was
/// recorded). Returns the persisted events in append order.
pub fn save_aggregate<A, S>(
    store: &S,
    aggregate: &mut A,
) -> Result<Vec<DomainEvent<A::Event>>, CoreError>
where
    A: Aggregate,
    S: EventLogStore<A::Event>,
{
    let pending = aggregate.take_uncommitted();
    if pending.is_empty() {
        return Ok(Vec::new());
    }
    let expected_version = aggregate.version() - pending.len() as u64;
    store.save(aggregate.aggregate_id(), expected_version, pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InMemoryEventLogStore;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Incremented,
    }

    impl EventKind for CounterEvent {
        fn event_name(&self) -> &'static str {
            "incremented"
        }
    }

    #[derive(Default)]
    struct Counter {
        id: String,
        count: u64,
        pending: Vec<PendingEvent<CounterEvent>>,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;

        fn new_blank(aggregate_id: &str) -> Self {
            Self {
                id: aggregate_id.to_string(),
                ..Default::default()
            }
        }

        fn aggregate_id(&self) -> &str {
            &self.id
        }

        fn version(&self) -> u64 {
            self.count
        }

        fn apply(&mut self, _event: &CounterEvent, _occurred_at: DateTime<Utc>) {
            self.count += 1;
        }

        fn uncommitted(&self) -> &[PendingEvent<CounterEvent>] {
            &self.pending
        }

        fn take_uncommitted(&mut self) -> Vec<PendingEvent<CounterEvent>> {
            std::mem::take(&mut self.pending)
        }
    }

    impl Counter {
        fn increment(&mut self) {
            self.apply(&CounterEvent::Incremented, Utc::now());
            self.pending.push(PendingEvent::new(
                CounterEvent::Incremented,
                Uuid::new_v4(),
                Uuid::new_v4(),
                "tester",
            ));
        }
    }

    #[test]
    fn save_then_reload_roundtrips() {
        let store: InMemoryEventLogStore<CounterEvent> = InMemoryEventLogStore::new();

        let mut counter = Counter::new_blank("counter-1");
        counter.increment();
        counter.increment();
        save_aggregate(&store, &mut counter).unwrap();
        assert!(counter.uncommitted().is_empty());

        let reloaded: Counter = load_aggregate(&store, "counter-1").unwrap();
        assert_eq!(reloaded.version(), 2);
    }
}
