//! Domain errors: violations the `WaitingQueue` aggregate itself rejects
//! (§7 taxonomy). Infrastructure errors (concurrency conflicts, not-found)
//! live in `waitqueue_core::CoreError` instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("queue is at capacity")]
    QueueAtCapacity,
    #[error("patient {0} is already present in the queue")]
    DuplicatePatient(String),
    #[error("invalid priority: {0}")]
    InvalidPriority(String),
    #[error("invalid consultation type: {0}")]
    InvalidConsultationType(String),
    #[error("invalid state transition: patient {patient_id} is in {from:?}, cannot {action}")]
    InvalidStateTransition {
        patient_id: String,
        from: String,
        action: &'static str,
    },
    #[error("no active patient for this operation")]
    NoActivePatient,
    #[error("no active consulting room for station {0}")]
    NoActiveConsultingRoom(String),
    #[error("consulting room {0} is already active")]
    ConsultingRoomAlreadyActive(String),
    #[error("consulting room {0} is already inactive")]
    ConsultingRoomAlreadyInactive(String),
    #[error("queue name must not be empty")]
    EmptyQueueName,
    #[error("max capacity must be positive")]
    NonPositiveCapacity,
    #[error("patient {0} not found in queue")]
    PatientNotFound(String),
}
