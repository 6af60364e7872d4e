//! Errors raised while publishing outbox entries to the bus.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("core store error: {0}")]
    Core(#[from] waitqueue_core::CoreError),
    #[error("bus connection error: {0}")]
    Bus(String),
    #[error("publish error: {0}")]
    Publish(String),
}

impl From<lapin::Error> for DispatchError {
    fn from(e: lapin::Error) -> Self {
        DispatchError::Bus(e.to_string())
    }
}
