//! Command handlers: orchestrate load → mutate → save → enqueue (§4.1/§4.2).
//!
//! One method per write-side command from §6. Each loads the aggregate from
//! the event log, applies the mutation, persists the resulting events (which
//! atomically enqueues the matching outbox rows, per `EventLogStore::save`),
//! and returns the persisted events to the caller so a thin adapter can
//! build the `{error, message, correlationId}` envelope.

use uuid::Uuid;
use waitqueue_core::{load_aggregate, save_aggregate, CoreError, DomainEvent, EventLogStore};

use crate::aggregate::{CheckInRequest, WaitingQueue};
use crate::error::DomainError;
use crate::events::WaitingQueueEventKind;
use crate::patient::AttentionOutcome;

/// Errors a command handler can return: either the aggregate rejected the
/// operation (§7 domain violation, maps to 400) or the infrastructure layer
/// did (concurrency conflict / not found, maps to 409 / 404).
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub struct CommandHandlers<'a, S> {
    store: &'a S,
}

impl<'a, S> CommandHandlers<'a, S>
where
    S: EventLogStore<WaitingQueueEventKind>,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn run<F>(
        &self,
        queue_id: &str,
        mutate: F,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError>
    where
        F: FnOnce(&mut WaitingQueue) -> Result<(), DomainError>,
    {
        let mut queue: WaitingQueue = load_aggregate(self.store, queue_id)?;
        mutate(&mut queue)?;
        Ok(save_aggregate(self.store, &mut queue)?)
    }

    pub fn create_queue(
        &self,
        queue_id: &str,
        queue_name: &str,
        max_capacity: u32,
        metadata: serde_json::Value,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        let causation_id = correlation_id;
        let mut queue = WaitingQueue::create(
            queue_id,
            queue_name,
            max_capacity,
            metadata,
            correlation_id,
            causation_id,
            actor,
        )?;
        Ok(save_aggregate(self.store, &mut queue)?)
    }

    pub fn check_in_patient(
        &self,
        queue_id: &str,
        request: CheckInRequest,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        let causation_id = correlation_id;
        self.run(queue_id, move |queue| {
            queue.check_in_patient(request, correlation_id, causation_id, actor.to_string())
        })
    }

    pub fn call_next_at_cashier(
        &self,
        queue_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.call_next_at_cashier(correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn validate_payment(
        &self,
        queue_id: &str,
        patient_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.validate_payment(patient_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn mark_payment_pending(
        &self,
        queue_id: &str,
        patient_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.mark_payment_pending(patient_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn mark_absent_at_cashier(
        &self,
        queue_id: &str,
        patient_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.mark_absent_at_cashier(patient_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn cancel_payment(
        &self,
        queue_id: &str,
        patient_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.cancel_by_payment(patient_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn activate_consulting_room(
        &self,
        queue_id: &str,
        room_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.activate_consulting_room(room_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn deactivate_consulting_room(
        &self,
        queue_id: &str,
        room_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.deactivate_consulting_room(room_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn claim_next_patient(
        &self,
        queue_id: &str,
        station_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.claim_next_patient(station_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn start_consultation(
        &self,
        queue_id: &str,
        patient_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.call_patient(patient_id, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn finish_consultation(
        &self,
        queue_id: &str,
        patient_id: &str,
        outcome: AttentionOutcome,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.complete_attention(patient_id, outcome, correlation_id, correlation_id, actor.to_string())
        })
    }

    pub fn mark_absent_at_consultation(
        &self,
        queue_id: &str,
        patient_id: &str,
        correlation_id: Uuid,
        actor: &str,
    ) -> Result<Vec<DomainEvent<WaitingQueueEventKind>>, CommandError> {
        self.run(queue_id, |queue| {
            queue.mark_absent_at_consultation(patient_id, correlation_id, correlation_id, actor.to_string())
        })
    }
}
