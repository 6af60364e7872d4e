//! waitqueue-core: event-sourcing runtime shared by every aggregate in the
//! waiting-room service.
//!
//! - `event`: the event envelope (`DomainEvent`, `EventMetadata`) and the
//!   append-only `EventLogStore` trait (in-memory + Postgres backends).
//! - `outbox`: the transactional outbox row shape and `OutboxStore` trait.
//! - `checkpoint`: projection checkpoints and the idempotency ledger.
//! - `aggregate`: the generic `Aggregate` trait plus `load_aggregate`/
//!   `save_aggregate`, which fold history and enforce optimistic concurrency.
//! - `hashing`: canonical JSON for determinism checks across replay/rebuild.
//! - `lag`: the `LagTracker` trait recording when an event clears the
//!   published/processed stages (§4.6).
//! - `errors`: errors raised by this runtime (domain errors live in
//!   `waitqueue-domain`).

pub mod aggregate;
pub mod checkpoint;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod lag;
pub mod outbox;

pub use aggregate::{fold, load_aggregate, save_aggregate, Aggregate};
pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore, ProjectionCheckpoint};
pub use errors::CoreError;
pub use event::{DomainEvent, EventKind, EventLogStore, EventMetadata, InMemoryEventLogStore, PendingEvent};
pub use hashing::to_canonical_json;
pub use lag::{InMemoryLagTracker, LagTracker};
pub use outbox::{InMemoryOutboxStore, OutboxEntry, OutboxStatus, OutboxStore};
