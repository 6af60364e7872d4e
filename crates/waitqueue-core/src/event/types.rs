//! Event envelope types.
//!
//! - Every successful aggregate transition appends exactly one domain event.
//! - `EventMetadata` carries everything needed for tracing, idempotency and
//!   ordering; the event's own `kind` carries the semantic payload.
//! - `version` is assigned at persistence time, equal to the aggregate's
//!   version after the event has been applied (§3/§4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Implemented by the concrete per-aggregate event payload enum (e.g.
/// `WaitingQueueEventKind`). Kept separate from `DomainEvent` so the event
/// log / outbox machinery stays neutral to any one aggregate's event shape.
pub trait EventKind:
    Clone + std::fmt::Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Stable, lower-case wire name used for routing and type-registry lookup.
    fn event_name(&self) -> &'static str;
}

/// Metadata attached to every event, assigned partly at emission
/// (`correlation_id`, `causation_id`, `actor`) and partly at persistence
/// (`event_id`, `version`, `occurred_at`, `idempotency_key`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: Uuid,
    pub aggregate_id: String,
    pub version: u64,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub idempotency_key: Uuid,
    pub schema_version: u16,
}

/// A persisted, immutable event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<K: EventKind> {
    pub kind: K,
    pub metadata: EventMetadata,
}

impl<K: EventKind> DomainEvent<K> {
    pub fn event_name(&self) -> &'static str {
        self.kind.event_name()
    }
}

/// An event an aggregate has produced but not yet persisted. Correlation,
/// causation and actor are known at emission time; `event_id`, `version`,
/// `occurred_at` and `idempotency_key` are filled in by the store at save
/// time.
#[derive(Debug, Clone)]
pub struct PendingEvent<K: EventKind> {
    pub kind: K,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub actor: String,
}

impl<K: EventKind> PendingEvent<K> {
    pub fn new(
        kind: K,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            correlation_id,
            causation_id,
            actor: actor.into(),
        }
    }
}
