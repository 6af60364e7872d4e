//! Errors raised by the event log / outbox runtime (not domain errors —
//! those live in `waitqueue-domain`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("concurrency conflict: expected version {expected}, found {found}")]
    ConcurrencyConflict { expected: u64, found: u64 },
    #[error("aggregate not found: {0}")]
    NotFound(String),
    #[error("no type registered for event name {0}")]
    UnknownEventType(String),
    #[error("internal: {0}")]
    Internal(String),
}
