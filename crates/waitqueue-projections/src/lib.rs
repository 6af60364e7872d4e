//! waitqueue-projections: the idempotent projection engine that turns the
//! `WaitingQueue` event log into the four operator-facing read views.
//!
//! - `views`: `MonitorView`, `QueueStateView`, `NextTurnView`,
//!   `RecentHistoryView`.
//! - `context`: `ProjectionContext`, which owns the four views and knows how
//!   to apply one event's effect to them.
//! - `engine`: `ProjectionEngine`, which wraps a `ProjectionContext` with
//!   idempotency-key derivation, the ledger, and checkpointing.
//! - `error`: `ProjectionError`.

pub mod context;
pub mod engine;
pub mod error;
pub mod views;

pub use context::ProjectionContext;
pub use engine::{ProjectionEngine, PROJECTION_ID};
pub use error::ProjectionError;
pub use views::{
    CompletedAttentionEntry, MonitorEntry, MonitorView, NextTurnEntry, NextTurnStation,
    NextTurnView, QueuedPatient, QueueStateEntry, QueueStateView, RecentHistoryView,
    RECENT_HISTORY_LIMIT,
};
