//! Event envelope types and the append-only `EventLogStore` trait.

mod store;
mod types;

pub use store::{EventLogStore, InMemoryEventLogStore};
pub use types::{DomainEvent, EventKind, EventMetadata, PendingEvent};
