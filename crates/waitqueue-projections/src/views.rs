//! The four denormalized read views (§3 "Read views"), each keyed by
//! `queueId`. Ordering/derived-field logic mirrors the prose in §4.5
//! ("Views and priority ordering"): the queue-state patient list is sorted
//! priority-tier-then-arrival using the same comparison
//! `waitqueue_domain::selection::select_next` uses, and the monitor view's
//! average-wait-time is computed on read rather than maintained
//! incrementally, exactly as specified.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waitqueue_domain::{AttentionOutcome, PatientState, Priority};

/// Bound on the recent-attention-history ring per queue (§3).
pub const RECENT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorEntry {
    pub max_capacity: u32,
    pub total_waiting: u64,
    pub low_priority_count: u64,
    pub medium_priority_count: u64,
    pub high_priority_count: u64,
    pub last_check_in_time: Option<DateTime<Utc>>,
    /// Check-in times of patients not yet in a terminal state, kept so
    /// average wait can be derived at read time rather than maintained as a
    /// running average (which would drift under replay).
    waiting_check_in_times: Vec<DateTime<Utc>>,
}

impl MonitorEntry {
    /// Average minutes waited by patients still in a non-terminal state, as
    /// of `now`. `None` if nobody is waiting.
    pub fn average_wait_minutes(&self, now: DateTime<Utc>) -> Option<f64> {
        if self.waiting_check_in_times.is_empty() {
            return None;
        }
        let total_minutes: f64 = self
            .waiting_check_in_times
            .iter()
            .map(|t| (now - *t).num_seconds() as f64 / 60.0)
            .sum();
        Some(total_minutes / self.waiting_check_in_times.len() as f64)
    }

    /// Percentage of `max_capacity` currently occupied by non-terminal
    /// patients.
    pub fn utilization_percent(&self) -> f64 {
        if self.max_capacity == 0 {
            return 0.0;
        }
        (self.total_waiting as f64 / self.max_capacity as f64) * 100.0
    }

    fn priority_count_mut(&mut self, priority: Priority) -> &mut u64 {
        match priority {
            Priority::Low => &mut self.low_priority_count,
            Priority::Medium => &mut self.medium_priority_count,
            Priority::High | Priority::Urgent => &mut self.high_priority_count,
        }
    }
}

#[derive(Debug, Default)]
pub struct MonitorView {
    entries: HashMap<String, MonitorEntry>,
}

impl MonitorView {
    pub fn get(&self, queue_id: &str) -> Option<&MonitorEntry> {
        self.entries.get(queue_id)
    }

    pub fn on_queue_created(&mut self, queue_id: &str, max_capacity: u32) {
        self.entries.insert(
            queue_id.to_string(),
            MonitorEntry { max_capacity, ..Default::default() },
        );
    }

    pub fn on_patient_checked_in(
        &mut self,
        queue_id: &str,
        priority: Priority,
        check_in_time: DateTime<Utc>,
    ) {
        let entry = self.entries.entry(queue_id.to_string()).or_default();
        entry.total_waiting += 1;
        *entry.priority_count_mut(priority) += 1;
        entry.last_check_in_time = Some(check_in_time);
        entry.waiting_check_in_times.push(check_in_time);
    }

    /// Called whenever a patient leaves the system (cancellation or
    /// completion): removes one check-in timestamp from the waiting pool and
    /// decrements the matching priority count.
    pub fn on_patient_left(&mut self, queue_id: &str, priority: Priority, check_in_time: DateTime<Utc>) {
        let entry = self.entries.entry(queue_id.to_string()).or_default();
        entry.total_waiting = entry.total_waiting.saturating_sub(1);
        let count = entry.priority_count_mut(priority);
        *count = count.saturating_sub(1);
        if let Some(pos) = entry
            .waiting_check_in_times
            .iter()
            .position(|t| *t == check_in_time)
        {
            entry.waiting_check_in_times.remove(pos);
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPatient {
    pub patient_id: String,
    pub patient_name: String,
    pub priority: Priority,
    pub state: PatientState,
    pub check_in_time: DateTime<Utc>,
    pub queue_position: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStateEntry {
    pub max_capacity: u32,
    pub patients: Vec<QueuedPatient>,
}

impl QueueStateEntry {
    pub fn current_count(&self) -> u64 {
        self.patients.len() as u64
    }

    pub fn is_at_capacity(&self) -> bool {
        self.current_count() >= self.max_capacity as u64
    }

    fn resort(&mut self) {
        self.patients.sort_by(|a, b| {
            a.priority
                .tier_rank()
                .cmp(&b.priority.tier_rank())
                .then(a.check_in_time.cmp(&b.check_in_time))
                .then(a.queue_position.cmp(&b.queue_position))
        });
    }
}

#[derive(Debug, Default)]
pub struct QueueStateView {
    entries: HashMap<String, QueueStateEntry>,
}

impl QueueStateView {
    pub fn get(&self, queue_id: &str) -> Option<&QueueStateEntry> {
        self.entries.get(queue_id)
    }

    pub fn on_queue_created(&mut self, queue_id: &str, max_capacity: u32) {
        self.entries.insert(
            queue_id.to_string(),
            QueueStateEntry { max_capacity, patients: Vec::new() },
        );
    }

    pub fn on_patient_checked_in(&mut self, queue_id: &str, patient: QueuedPatient) {
        let entry = self.entries.entry(queue_id.to_string()).or_default();
        entry.patients.push(patient);
        entry.resort();
    }

    pub fn set_patient_state(&mut self, queue_id: &str, patient_id: &str, state: PatientState) {
        if let Some(entry) = self.entries.get_mut(queue_id) {
            if let Some(p) = entry.patients.iter_mut().find(|p| p.patient_id == patient_id) {
                p.state = state;
            }
            entry.resort();
        }
    }

    pub fn remove_patient(&mut self, queue_id: &str, patient_id: &str) -> Option<QueuedPatient> {
        let entry = self.entries.get_mut(queue_id)?;
        let idx = entry.patients.iter().position(|p| p.patient_id == patient_id)?;
        Some(entry.patients.remove(idx))
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Which station currently holds the on-deck patient (§3: "claimed or
/// called"). Resolved Open Question: the source models one active cashier
/// patient and one active medical-attention patient per queue, never
/// merged into a single system-wide slot, so this view keeps one entry per
/// station rather than one patient overall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextTurnEntry {
    pub patient_id: String,
    pub patient_name: String,
    pub station: NextTurnStation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextTurnStation {
    Cashier,
    Consultation { room_id: String },
}

#[derive(Debug, Default)]
pub struct NextTurnView {
    cashier: HashMap<String, NextTurnEntry>,
    consultation: HashMap<String, NextTurnEntry>,
}

impl NextTurnView {
    pub fn cashier_next(&self, queue_id: &str) -> Option<&NextTurnEntry> {
        self.cashier.get(queue_id)
    }

    pub fn consultation_next(&self, queue_id: &str) -> Option<&NextTurnEntry> {
        self.consultation.get(queue_id)
    }

    pub fn set_cashier_next(&mut self, queue_id: &str, entry: NextTurnEntry) {
        self.cashier.insert(queue_id.to_string(), entry);
    }

    pub fn clear_cashier_next(&mut self, queue_id: &str) {
        self.cashier.remove(queue_id);
    }

    pub fn set_consultation_next(&mut self, queue_id: &str, entry: NextTurnEntry) {
        self.consultation.insert(queue_id.to_string(), entry);
    }

    pub fn clear_consultation_next(&mut self, queue_id: &str) {
        self.consultation.remove(queue_id);
    }

    pub fn reset(&mut self) {
        self.cashier.clear();
        self.consultation.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedAttentionEntry {
    pub patient_id: String,
    pub patient_name: String,
    pub outcome: AttentionOutcome,
    pub completed_at: DateTime<Utc>,
}

/// Bounded ring: holds at most `RECENT_HISTORY_LIMIT` entries per queue,
/// newest first.
#[derive(Debug, Default)]
pub struct RecentHistoryView {
    entries: HashMap<String, Vec<CompletedAttentionEntry>>,
}

impl RecentHistoryView {
    pub fn get(&self, queue_id: &str) -> &[CompletedAttentionEntry] {
        self.entries.get(queue_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record(&mut self, queue_id: &str, entry: CompletedAttentionEntry) {
        let ring = self.entries.entry(queue_id.to_string()).or_default();
        ring.insert(0, entry);
        ring.truncate(RECENT_HISTORY_LIMIT);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
