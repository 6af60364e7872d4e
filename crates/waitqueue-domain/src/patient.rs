//! `WaitingPatient` entity and its value objects (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    /// Reserved for auto-prioritization; not directly assignable from a
    /// check-in request (resolved Open Question, see SPEC_FULL.md §3.2).
    Urgent,
}

impl Priority {
    /// Derive.hack: used to rank patients within `selection::order_candidates`.
    /// Higher tier sorts first. `Urgent` folds into the `High` tier per the
    /// resolved priority policy.
    pub fn tier_rank(self) -> u8 {
        match self {
            Priority::High | Priority::Urgent => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn from_request_str(s: &str) -> Result<Self, DomainError> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            "Urgent" => Err(DomainError::InvalidPriority(
                "Urgent is reserved for auto-prioritization".into(),
            )),
            other => Err(DomainError::InvalidPriority(other.to_string())),
        }
    }
}

/// Per-patient state machine (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientState {
    Registrado,
    EnEsperaTaquilla,
    EnTaquilla,
    PagoPendiente,
    AusenteTaquilla,
    EnEsperaConsulta,
    LlamadoConsulta,
    EnConsulta,
    AusenteConsulta,
    Finalizado,
    CanceladoPorPago,
    CanceladoPorAusencia,
}

impl PatientState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PatientState::Finalizado
                | PatientState::CanceladoPorPago
                | PatientState::CanceladoPorAusencia
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            PatientState::Registrado => "Registrado",
            PatientState::EnEsperaTaquilla => "EnEsperaTaquilla",
            PatientState::EnTaquilla => "EnTaquilla",
            PatientState::PagoPendiente => "PagoPendiente",
            PatientState::AusenteTaquilla => "AusenteTaquilla",
            PatientState::EnEsperaConsulta => "EnEsperaConsulta",
            PatientState::LlamadoConsulta => "LlamadoConsulta",
            PatientState::EnConsulta => "EnConsulta",
            PatientState::AusenteConsulta => "AusenteConsulta",
            PatientState::Finalizado => "Finalizado",
            PatientState::CanceladoPorPago => "CanceladoPorPago",
            PatientState::CanceladoPorAusencia => "CanceladoPorAusencia",
        }
    }
}

/// Outcome recorded by `completeAttention`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionOutcome {
    pub summary: String,
    pub notes: Option<String>,
}

pub const MAX_PAYMENT_ATTEMPTS: u32 = 3;
pub const MAX_CASHIER_ABSENCE_RETRIES: u32 = 2;
pub const MAX_CONSULTATION_ABSENCE_RETRIES: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingPatient {
    pub patient_id: String,
    pub patient_name: String,
    pub priority: Priority,
    pub consultation_type: String,
    pub check_in_time: DateTime<Utc>,
    pub queue_position: u64,
    pub notes: Option<String>,
    pub state: PatientState,
    pub payment_attempts: u32,
    pub cashier_absence_retries: u32,
    pub consultation_absence_retries: u32,
    pub claiming_room_id: Option<String>,
}

pub fn validate_consultation_type(consultation_type: &str) -> Result<(), DomainError> {
    let len = consultation_type.chars().count();
    if !(2..=100).contains(&len) {
        return Err(DomainError::InvalidConsultationType(
            consultation_type.to_string(),
        ));
    }
    Ok(())
}
