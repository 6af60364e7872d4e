//! waitqueue-dispatcher
//!
//! The outbox dispatcher worker (§4.3): polls `OutboxStore` for due rows and
//! publishes them through an `EventPublisher`, with exponential backoff and
//! poison-message (dead-letter) handling. Runs as its own process
//! (`waitqueue-app::bin::dispatcher_worker`), sharing the same Postgres
//! database as the command service but never the same in-process state —
//! every instance talks to the store only, per §9's single-writer
//! resolution (no row-locking `fetchPending`, so exactly one dispatcher
//! instance runs against a given outbox in production).

pub mod error;
pub mod loop_;
pub mod publisher;

pub use error::DispatchError;
pub use loop_::OutboxDispatcher;
pub use publisher::{AmqpPublisher, EventPublisher, NoopPublisher};
