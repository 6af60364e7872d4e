//! `WaitingQueueEventKind`: the full event vocabulary of the `WaitingQueue`
//! aggregate (§4.1). One variant per successful state transition; every
//! field here becomes part of the event's JSON payload once wrapped in a
//! `waitqueue_core::DomainEvent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waitqueue_core::EventKind;

use crate::patient::{AttentionOutcome, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WaitingQueueEventKind {
    WaitingQueueCreated {
        queue_name: String,
        max_capacity: u32,
        metadata: serde_json::Value,
    },
    PatientCheckedIn {
        patient_id: String,
        patient_name: String,
        priority: Priority,
        consultation_type: String,
        check_in_time: DateTime<Utc>,
        queue_position: u64,
        notes: Option<String>,
    },
    PatientCalledAtCashier {
        patient_id: String,
    },
    PatientPaymentValidated {
        patient_id: String,
    },
    PatientPaymentPending {
        patient_id: String,
        attempt: u32,
    },
    PatientAbsentAtCashier {
        patient_id: String,
        retry: u32,
    },
    PatientCancelledByPayment {
        patient_id: String,
        reason: String,
    },
    ConsultingRoomActivated {
        room_id: String,
    },
    ConsultingRoomDeactivated {
        room_id: String,
    },
    PatientClaimedForAttention {
        patient_id: String,
        station_id: String,
    },
    PatientConsultationStarted {
        patient_id: String,
    },
    PatientAttentionCompleted {
        patient_id: String,
        outcome: AttentionOutcome,
    },
    PatientAbsentAtConsultation {
        patient_id: String,
        retry: u32,
    },
    PatientCancelledByAbsence {
        patient_id: String,
    },
}

impl EventKind for WaitingQueueEventKind {
    fn event_name(&self) -> &'static str {
        match self {
            WaitingQueueEventKind::WaitingQueueCreated { .. } => "WaitingQueueCreated",
            WaitingQueueEventKind::PatientCheckedIn { .. } => "PatientCheckedIn",
            WaitingQueueEventKind::PatientCalledAtCashier { .. } => "PatientCalledAtCashier",
            WaitingQueueEventKind::PatientPaymentValidated { .. } => "PatientPaymentValidated",
            WaitingQueueEventKind::PatientPaymentPending { .. } => "PatientPaymentPending",
            WaitingQueueEventKind::PatientAbsentAtCashier { .. } => "PatientAbsentAtCashier",
            WaitingQueueEventKind::PatientCancelledByPayment { .. } => "PatientCancelledByPayment",
            WaitingQueueEventKind::ConsultingRoomActivated { .. } => "ConsultingRoomActivated",
            WaitingQueueEventKind::ConsultingRoomDeactivated { .. } => "ConsultingRoomDeactivated",
            WaitingQueueEventKind::PatientClaimedForAttention { .. } => "PatientClaimedForAttention",
            WaitingQueueEventKind::PatientConsultationStarted { .. } => "PatientConsultationStarted",
            WaitingQueueEventKind::PatientAttentionCompleted { .. } => "PatientAttentionCompleted",
            WaitingQueueEventKind::PatientAbsentAtConsultation { .. } => "PatientAbsentAtConsultation",
            WaitingQueueEventKind::PatientCancelledByAbsence { .. } => "PatientCancelledByAbsence",
        }
    }
}
