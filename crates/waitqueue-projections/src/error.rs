//! Errors raised while applying events to read views.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] waitqueue_core::CoreError),
    #[error("no handler registered for event {0}")]
    UnknownEvent(String),
}
