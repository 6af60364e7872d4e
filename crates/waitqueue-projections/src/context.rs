//! `ProjectionContext`: owns the four read views and applies one event's
//! worth of deterministic updates to them (§4.5 step 3). Idempotency-key
//! derivation, the ledger check and checkpointing are the engine's job, not
//! this struct's — this is purely "given an event I know I must apply,
//! update the views".

use chrono::{DateTime, Utc};
use waitqueue_domain::{PatientState, WaitingQueueEventKind};

use crate::views::{
    CompletedAttentionEntry, MonitorView, NextTurnEntry, NextTurnStation, NextTurnView,
    QueuedPatient, QueueStateView, RecentHistoryView,
};

#[derive(Debug, Default)]
pub struct ProjectionContext {
    pub monitor: MonitorView,
    pub queue_state: QueueStateView,
    pub next_turn: NextTurnView,
    pub recent_history: RecentHistoryView,
}

impl ProjectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_all(&mut self) {
        self.monitor.reset();
        self.queue_state.reset();
        self.next_turn.reset();
        self.recent_history.reset();
    }

    /// Applies one event's effect to whichever views it touches. `queue_id`
    /// is the triggering aggregate's id (queues and the `WaitingQueue`
    /// aggregate are the same thing in this model). `occurred_at` is the
    /// event's own timestamp, not the clock at apply time, so a `rebuild()`
    /// replaying later than the original incremental processing produces a
    /// byte-equivalent view (§8).
    pub fn apply_event(&mut self, queue_id: &str, kind: &WaitingQueueEventKind, occurred_at: DateTime<Utc>) {
        match kind {
            WaitingQueueEventKind::WaitingQueueCreated { max_capacity, .. } => {
                self.monitor.on_queue_created(queue_id, *max_capacity);
                self.queue_state.on_queue_created(queue_id, *max_capacity);
            }
            WaitingQueueEventKind::PatientCheckedIn {
                patient_id,
                patient_name,
                priority,
                check_in_time,
                queue_position,
                ..
            } => {
                self.monitor.on_patient_checked_in(queue_id, *priority, *check_in_time);
                self.queue_state.on_patient_checked_in(
                    queue_id,
                    QueuedPatient {
                        patient_id: patient_id.clone(),
                        patient_name: patient_name.clone(),
                        priority: *priority,
                        state: PatientState::EnEsperaTaquilla,
                        check_in_time: *check_in_time,
                        queue_position: *queue_position,
                    },
                );
            }
            WaitingQueueEventKind::PatientCalledAtCashier { patient_id } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::EnTaquilla);
                if let Some(name) = self.patient_name(queue_id, patient_id) {
                    self.next_turn.set_cashier_next(
                        queue_id,
                        NextTurnEntry {
                            patient_id: patient_id.clone(),
                            patient_name: name,
                            station: NextTurnStation::Cashier,
                        },
                    );
                }
            }
            WaitingQueueEventKind::PatientPaymentValidated { patient_id } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::EnEsperaConsulta);
                self.next_turn.clear_cashier_next(queue_id);
            }
            WaitingQueueEventKind::PatientPaymentPending { patient_id, .. } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::PagoPendiente);
            }
            WaitingQueueEventKind::PatientAbsentAtCashier { patient_id, .. } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::AusenteTaquilla);
                self.next_turn.clear_cashier_next(queue_id);
            }
            WaitingQueueEventKind::PatientCancelledByPayment { patient_id, .. } => {
                self.next_turn.clear_cashier_next(queue_id);
                if let Some(removed) = self.queue_state.remove_patient(queue_id, patient_id) {
                    self.monitor.on_patient_left(queue_id, removed.priority, removed.check_in_time);
                }
            }
            WaitingQueueEventKind::ConsultingRoomActivated { .. }
            | WaitingQueueEventKind::ConsultingRoomDeactivated { .. } => {
                // Consulting-room registry isn't reflected in any read view (§3).
            }
            WaitingQueueEventKind::PatientClaimedForAttention { patient_id, station_id } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::LlamadoConsulta);
                if let Some(name) = self.patient_name(queue_id, patient_id) {
                    self.next_turn.set_consultation_next(
                        queue_id,
                        NextTurnEntry {
                            patient_id: patient_id.clone(),
                            patient_name: name,
                            station: NextTurnStation::Consultation { room_id: station_id.clone() },
                        },
                    );
                }
            }
            WaitingQueueEventKind::PatientConsultationStarted { patient_id } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::EnConsulta);
            }
            WaitingQueueEventKind::PatientAttentionCompleted { patient_id, outcome } => {
                self.next_turn.clear_consultation_next(queue_id);
                if let Some(removed) = self.queue_state.remove_patient(queue_id, patient_id) {
                    self.monitor.on_patient_left(queue_id, removed.priority, removed.check_in_time);
                    self.recent_history.record(
                        queue_id,
                        CompletedAttentionEntry {
                            patient_id: removed.patient_id,
                            patient_name: removed.patient_name,
                            outcome: outcome.clone(),
                            completed_at: occurred_at,
                        },
                    );
                }
            }
            WaitingQueueEventKind::PatientAbsentAtConsultation { patient_id, .. } => {
                self.queue_state.set_patient_state(queue_id, patient_id, PatientState::AusenteConsulta);
                self.next_turn.clear_consultation_next(queue_id);
            }
            WaitingQueueEventKind::PatientCancelledByAbsence { patient_id } => {
                self.next_turn.clear_consultation_next(queue_id);
                if let Some(removed) = self.queue_state.remove_patient(queue_id, patient_id) {
                    self.monitor.on_patient_left(queue_id, removed.priority, removed.check_in_time);
                }
            }
        }
    }

    fn patient_name(&self, queue_id: &str, patient_id: &str) -> Option<String> {
        self.queue_state
            .get(queue_id)?
            .patients
            .iter()
            .find(|p| p.patient_id == patient_id)
            .map(|p| p.patient_name.clone())
    }
}
