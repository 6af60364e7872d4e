//! `WaitingQueue`: the aggregate root (§3/§4.1).
//!
//! Command methods validate invariants, mutate state, and record exactly one
//! `PendingEvent` per successful transition (never more than one, never a
//! partial mutation without a matching event). `apply` is the fold arm used
//! both for replay and for advancing state live — it must stay a pure
//! function of `(state, event)`.
//!
//! Known gap carried over unchanged from the source system (resolved Open
//! Question #3): only one patient may be in active medical attention at a
//! time, even if several consulting rooms are active.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waitqueue_core::{Aggregate, PendingEvent};

use crate::error::DomainError;
use crate::events::WaitingQueueEventKind;
use crate::patient::{
    validate_consultation_type, AttentionOutcome, PatientState, Priority, WaitingPatient,
    MAX_CASHIER_ABSENCE_RETRIES, MAX_CONSULTATION_ABSENCE_RETRIES, MAX_PAYMENT_ATTEMPTS,
};
use crate::selection::select_next;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub patient_id: String,
    pub patient_name: String,
    pub priority: String,
    pub consultation_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct WaitingQueue {
    queue_id: String,
    queue_name: String,
    max_capacity: u32,
    version: u64,
    created_at: Option<DateTime<Utc>>,
    last_modified_at: Option<DateTime<Utc>>,
    patients: Vec<WaitingPatient>,
    current_cashier_patient_id: Option<String>,
    current_attention_patient_id: Option<String>,
    active_consulting_rooms: HashSet<String>,
    next_queue_position: u64,
    pending: Vec<PendingEvent<WaitingQueueEventKind>>,
}

impl WaitingQueue {
    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    pub fn patients(&self) -> &[WaitingPatient] {
        &self.patients
    }

    pub fn active_consulting_rooms(&self) -> &HashSet<String> {
        &self.active_consulting_rooms
    }

    fn patient(&self, patient_id: &str) -> Result<&WaitingPatient, DomainError> {
        self.patients
            .iter()
            .find(|p| p.patient_id == patient_id)
            .ok_or_else(|| DomainError::PatientNotFound(patient_id.to_string()))
    }

    fn patient_mut(&mut self, patient_id: &str) -> Result<&mut WaitingPatient, DomainError> {
        self.patients
            .iter_mut()
            .find(|p| p.patient_id == patient_id)
            .ok_or_else(|| DomainError::PatientNotFound(patient_id.to_string()))
    }

    fn emit(
        &mut self,
        kind: WaitingQueueEventKind,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) {
        // Not yet persisted, so there's no real `occurred_at` to thread
        // through — the store stamps the actual one at save time. `fold`
        // (replay) always calls `apply` with the persisted timestamp; this
        // live call is the one place `Utc::now()` stands in for it.
        self.apply(&kind, Utc::now());
        self.pending
            .push(PendingEvent::new(kind, correlation_id, causation_id, actor));
    }

    // -- Commands (§4.1) ----------------------------------------------------

    pub fn create(
        queue_id: impl Into<String>,
        queue_name: &str,
        max_capacity: u32,
        metadata: serde_json::Value,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if queue_name.trim().is_empty() {
            return Err(DomainError::EmptyQueueName);
        }
        if max_capacity == 0 {
            return Err(DomainError::NonPositiveCapacity);
        }
        let mut queue = Self::new_blank(&queue_id.into());
        queue.emit(
            WaitingQueueEventKind::WaitingQueueCreated {
                queue_name: queue_name.to_string(),
                max_capacity,
                metadata,
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(queue)
    }

    pub fn check_in_patient(
        &mut self,
        request: CheckInRequest,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        if self.active_patient_count() >= self.max_capacity as usize {
            return Err(DomainError::QueueAtCapacity);
        }
        if self
            .patients
            .iter()
            .any(|p| p.patient_id == request.patient_id && !p.state.is_terminal())
        {
            return Err(DomainError::DuplicatePatient(request.patient_id));
        }
        validate_consultation_type(&request.consultation_type)?;

        let priority = auto_priority(&request.consultation_type)
            .unwrap_or(Priority::from_request_str(&request.priority)?);

        self.emit(
            WaitingQueueEventKind::PatientCheckedIn {
                patient_id: request.patient_id,
                patient_name: request.patient_name,
                priority,
                consultation_type: request.consultation_type,
                check_in_time: Utc::now(),
                queue_position: self.next_queue_position,
                notes: request.notes,
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn call_next_at_cashier(
        &mut self,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        if let Some(current) = self.current_cashier_patient_id.clone() {
            let state = self.patient(&current)?.state;
            if matches!(state, PatientState::PagoPendiente) {
                self.emit(
                    WaitingQueueEventKind::PatientCalledAtCashier { patient_id: current },
                    correlation_id,
                    causation_id,
                    actor,
                );
                return Ok(());
            }
            return Err(DomainError::InvalidStateTransition {
                patient_id: current,
                from: state.label().to_string(),
                action: "call-next (cashier already active)",
            });
        }

        let candidates: Vec<&WaitingPatient> = self
            .patients
            .iter()
            .filter(|p| {
                matches!(
                    p.state,
                    PatientState::EnEsperaTaquilla | PatientState::AusenteTaquilla
                )
            })
            .collect();
        let idx = select_next(&candidates).ok_or(DomainError::NoActivePatient)?;
        let patient_id = candidates[idx].patient_id.clone();
        self.emit(
            WaitingQueueEventKind::PatientCalledAtCashier { patient_id },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn validate_payment(
        &mut self,
        patient_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        self.require_state(patient_id, PatientState::EnTaquilla, "validate-payment")?;
        self.emit(
            WaitingQueueEventKind::PatientPaymentValidated {
                patient_id: patient_id.to_string(),
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn mark_payment_pending(
        &mut self,
        patient_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        let state = self.patient(patient_id)?.state;
        if !matches!(state, PatientState::EnTaquilla | PatientState::PagoPendiente) {
            return Err(DomainError::InvalidStateTransition {
                patient_id: patient_id.to_string(),
                from: state.label().to_string(),
                action: "mark-payment-pending",
            });
        }
        let attempt = self.patient(patient_id)?.payment_attempts + 1;
        if attempt >= MAX_PAYMENT_ATTEMPTS {
            self.emit(
                WaitingQueueEventKind::PatientPaymentPending {
                    patient_id: patient_id.to_string(),
                    attempt,
                },
                correlation_id,
                causation_id,
                Into::<String>::into(actor),
            );
            self.emit(
                WaitingQueueEventKind::PatientCancelledByPayment {
                    patient_id: patient_id.to_string(),
                    reason: "max payment attempts exceeded".to_string(),
                },
                correlation_id,
                causation_id,
                "system",
            );
        } else {
            self.emit(
                WaitingQueueEventKind::PatientPaymentPending {
                    patient_id: patient_id.to_string(),
                    attempt,
                },
                correlation_id,
                causation_id,
                actor,
            );
        }
        Ok(())
    }

    pub fn mark_absent_at_cashier(
        &mut self,
        patient_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        let state = self.patient(patient_id)?.state;
        if !matches!(state, PatientState::EnTaquilla | PatientState::PagoPendiente) {
            return Err(DomainError::InvalidStateTransition {
                patient_id: patient_id.to_string(),
                from: state.label().to_string(),
                action: "mark-absent",
            });
        }
        let retry = self.patient(patient_id)?.cashier_absence_retries + 1;
        if retry > MAX_CASHIER_ABSENCE_RETRIES {
            self.emit(
                WaitingQueueEventKind::PatientCancelledByPayment {
                    patient_id: patient_id.to_string(),
                    reason: "max cashier absence retries exceeded".to_string(),
                },
                correlation_id,
                causation_id,
                actor,
            );
        } else {
            self.emit(
                WaitingQueueEventKind::PatientAbsentAtCashier {
                    patient_id: patient_id.to_string(),
                    retry,
                },
                correlation_id,
                causation_id,
                actor,
            );
        }
        Ok(())
    }

    pub fn cancel_by_payment(
        &mut self,
        patient_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        let state = self.patient(patient_id)?.state;
        if !matches!(
            state,
            PatientState::PagoPendiente | PatientState::AusenteTaquilla
        ) {
            return Err(DomainError::InvalidStateTransition {
                patient_id: patient_id.to_string(),
                from: state.label().to_string(),
                action: "cancel-payment",
            });
        }
        self.emit(
            WaitingQueueEventKind::PatientCancelledByPayment {
                patient_id: patient_id.to_string(),
                reason: "cancelled by operator".to_string(),
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn activate_consulting_room(
        &mut self,
        room_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        if self.active_consulting_rooms.contains(room_id) {
            return Err(DomainError::ConsultingRoomAlreadyActive(room_id.to_string()));
        }
        self.emit(
            WaitingQueueEventKind::ConsultingRoomActivated {
                room_id: room_id.to_string(),
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn deactivate_consulting_room(
        &mut self,
        room_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        if !self.active_consulting_rooms.contains(room_id) {
            return Err(DomainError::ConsultingRoomAlreadyInactive(room_id.to_string()));
        }
        self.emit(
            WaitingQueueEventKind::ConsultingRoomDeactivated {
                room_id: room_id.to_string(),
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn claim_next_patient(
        &mut self,
        station_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        if !self.active_consulting_rooms.contains(station_id) {
            return Err(DomainError::NoActiveConsultingRoom(station_id.to_string()));
        }

        if let Some(current) = self.current_attention_patient_id.clone() {
            let state = self.patient(&current)?.state;
            if matches!(state, PatientState::AusenteConsulta) {
                self.emit(
                    WaitingQueueEventKind::PatientClaimedForAttention {
                        patient_id: current,
                        station_id: station_id.to_string(),
                    },
                    correlation_id,
                    causation_id,
                    actor,
                );
                return Ok(());
            }
            return Err(DomainError::InvalidStateTransition {
                patient_id: current,
                from: state.label().to_string(),
                action: "claim-next (attention already active)",
            });
        }

        let candidates: Vec<&WaitingPatient> = self
            .patients
            .iter()
            .filter(|p| matches!(p.state, PatientState::EnEsperaConsulta))
            .collect();
        let idx = select_next(&candidates).ok_or(DomainError::NoActivePatient)?;
        let patient_id = candidates[idx].patient_id.clone();
        self.emit(
            WaitingQueueEventKind::PatientClaimedForAttention {
                patient_id,
                station_id: station_id.to_string(),
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn call_patient(
        &mut self,
        patient_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        self.require_state(patient_id, PatientState::LlamadoConsulta, "start-consultation")?;
        self.emit(
            WaitingQueueEventKind::PatientConsultationStarted {
                patient_id: patient_id.to_string(),
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn complete_attention(
        &mut self,
        patient_id: &str,
        outcome: AttentionOutcome,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        self.require_state(patient_id, PatientState::EnConsulta, "finish-consultation")?;
        self.emit(
            WaitingQueueEventKind::PatientAttentionCompleted {
                patient_id: patient_id.to_string(),
                outcome,
            },
            correlation_id,
            causation_id,
            actor,
        );
        Ok(())
    }

    pub fn mark_absent_at_consultation(
        &mut self,
        patient_id: &str,
        correlation_id: Uuid,
        causation_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<(), DomainError> {
        let state = self.patient(patient_id)?.state;
        if !matches!(
            state,
            PatientState::LlamadoConsulta | PatientState::AusenteConsulta
        ) {
            return Err(DomainError::InvalidStateTransition {
                patient_id: patient_id.to_string(),
                from: state.label().to_string(),
                action: "mark-absent",
            });
        }
        let retry = self.patient(patient_id)?.consultation_absence_retries + 1;
        if retry > MAX_CONSULTATION_ABSENCE_RETRIES {
            self.emit(
                WaitingQueueEventKind::PatientCancelledByAbsence {
                    patient_id: patient_id.to_string(),
                },
                correlation_id,
                causation_id,
                actor,
            );
        } else {
            self.emit(
                WaitingQueueEventKind::PatientAbsentAtConsultation {
                    patient_id: patient_id.to_string(),
                    retry,
                },
                correlation_id,
                causation_id,
                actor,
            );
        }
        Ok(())
    }

    // -- Helpers --------------------------------------------------------

    fn require_state(
        &self,
        patient_id: &str,
        expected: PatientState,
        action: &'static str,
    ) -> Result<(), DomainError> {
        let state = self.patient(patient_id)?.state;
        if state != expected {
            return Err(DomainError::InvalidStateTransition {
                patient_id: patient_id.to_string(),
                from: state.label().to_string(),
                action,
            });
        }
        Ok(())
    }

    fn active_patient_count(&self) -> usize {
        self.patients.iter().filter(|p| !p.state.is_terminal()).count()
    }
}

/// Gestante | Menor | Mayor-de-65 auto-prioritize to `High` (§4.1). Recognized
/// today by a literal consultation-type tag; a richer patient-attribute model
/// is out of this core's scope.
fn auto_priority(consultation_type: &str) -> Option<Priority> {
    let lowered = consultation_type.to_lowercase();
    if lowered.contains("gestante") || lowered.contains("menor") || lowered.contains("mayor-65") {
        Some(Priority::High)
    } else {
        None
    }
}

impl Aggregate for WaitingQueue {
    type Event = WaitingQueueEventKind;

    fn new_blank(aggregate_id: &str) -> Self {
        Self {
            queue_id: aggregate_id.to_string(),
            ..Default::default()
        }
    }

    fn aggregate_id(&self) -> &str {
        &self.queue_id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &WaitingQueueEventKind, occurred_at: DateTime<Utc>) {
        self.version += 1;
        self.last_modified_at = Some(occurred_at);
        match event {
            WaitingQueueEventKind::WaitingQueueCreated {
                queue_name,
                max_capacity,
                ..
            } => {
                self.queue_name = queue_name.clone();
                self.max_capacity = *max_capacity;
                self.created_at = Some(occurred_at);
            }
            WaitingQueueEventKind::PatientCheckedIn {
                patient_id,
                patient_name,
                priority,
                consultation_type,
                check_in_time,
                queue_position,
                notes,
            } => {
                self.patients.push(WaitingPatient {
                    patient_id: patient_id.clone(),
                    patient_name: patient_name.clone(),
                    priority: *priority,
                    consultation_type: consultation_type.clone(),
                    check_in_time: *check_in_time,
                    queue_position: *queue_position,
                    notes: notes.clone(),
                    state: PatientState::EnEsperaTaquilla,
                    payment_attempts: 0,
                    cashier_absence_retries: 0,
                    consultation_absence_retries: 0,
                    claiming_room_id: None,
                });
                self.next_queue_position = self.next_queue_position.max(*queue_position + 1);
            }
            WaitingQueueEventKind::PatientCalledAtCashier { patient_id } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::EnTaquilla;
                }
                self.current_cashier_patient_id = Some(patient_id.clone());
            }
            WaitingQueueEventKind::PatientPaymentValidated { patient_id } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::EnEsperaConsulta;
                }
                if self.current_cashier_patient_id.as_deref() == Some(patient_id.as_str()) {
                    self.current_cashier_patient_id = None;
                }
            }
            WaitingQueueEventKind::PatientPaymentPending { patient_id, attempt } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::PagoPendiente;
                    p.payment_attempts = *attempt;
                }
            }
            WaitingQueueEventKind::PatientAbsentAtCashier { patient_id, retry } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::AusenteTaquilla;
                    p.cashier_absence_retries = *retry;
                }
                if self.current_cashier_patient_id.as_deref() == Some(patient_id.as_str()) {
                    self.current_cashier_patient_id = None;
                }
            }
            WaitingQueueEventKind::PatientCancelledByPayment { patient_id, .. } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::CanceladoPorPago;
                }
                if self.current_cashier_patient_id.as_deref() == Some(patient_id.as_str()) {
                    self.current_cashier_patient_id = None;
                }
            }
            WaitingQueueEventKind::ConsultingRoomActivated { room_id } => {
                self.active_consulting_rooms.insert(room_id.clone());
            }
            WaitingQueueEventKind::ConsultingRoomDeactivated { room_id } => {
                self.active_consulting_rooms.remove(room_id);
            }
            WaitingQueueEventKind::PatientClaimedForAttention {
                patient_id,
                station_id,
            } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::LlamadoConsulta;
                    p.claiming_room_id = Some(station_id.clone());
                }
                self.current_attention_patient_id = Some(patient_id.clone());
            }
            WaitingQueueEventKind::PatientConsultationStarted { patient_id } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::EnConsulta;
                }
            }
            WaitingQueueEventKind::PatientAttentionCompleted { patient_id, .. } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::Finalizado;
                }
                if self.current_attention_patient_id.as_deref() == Some(patient_id.as_str()) {
                    self.current_attention_patient_id = None;
                }
            }
            WaitingQueueEventKind::PatientAbsentAtConsultation { patient_id, retry } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::AusenteConsulta;
                    p.consultation_absence_retries = *retry;
                }
            }
            WaitingQueueEventKind::PatientCancelledByAbsence { patient_id } => {
                if let Ok(p) = self.patient_mut(patient_id) {
                    p.state = PatientState::CanceladoPorAusencia;
                }
                if self.current_attention_patient_id.as_deref() == Some(patient_id.as_str()) {
                    self.current_attention_patient_id = None;
                }
            }
        }
    }

    fn uncommitted(&self) -> &[PendingEvent<WaitingQueueEventKind>] {
        &self.pending
    }

    fn take_uncommitted(&mut self) -> Vec<PendingEvent<WaitingQueueEventKind>> {
        std::mem::take(&mut self.pending)
    }
}
