//! waitqueue-domain: the `WaitingQueue` aggregate and its command surface.

pub mod aggregate;
pub mod commands;
pub mod error;
pub mod events;
pub mod patient;
pub mod selection;

pub use aggregate::{CheckInRequest, WaitingQueue};
pub use commands::{CommandError, CommandHandlers};
pub use error::DomainError;
pub use events::WaitingQueueEventKind;
pub use patient::{AttentionOutcome, PatientState, Priority, WaitingPatient};
