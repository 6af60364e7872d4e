//! Deterministic patient selection (§4.1.1): priority tier, then FIFO by
//! `check_in_time`, tie-broken by `queue_position`. Pure function over a
//! candidate slice, mirroring the teacher's `PropertySelectionPolicy::choose`
//! shape (a total order over candidates, no hidden state).

use crate::patient::WaitingPatient;

/// Returns the index (into `candidates`) of the patient that should be
/// selected next, or `None` if `candidates` is empty. Calling this twice on
/// the same slice always returns the same index (§8 determinism).
pub fn select_next(candidates: &[&WaitingPatient]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.priority
                .tier_rank()
                .cmp(&b.priority.tier_rank())
                .then(a.check_in_time.cmp(&b.check_in_time))
                .then(a.queue_position.cmp(&b.queue_position))
        })
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{PatientState, Priority};
    use chrono::{Duration, Utc};

    fn patient(id: &str, priority: Priority, offset_secs: i64, queue_position: u64) -> WaitingPatient {
        WaitingPatient {
            patient_id: id.into(),
            patient_name: id.into(),
            priority,
            consultation_type: "General".into(),
            check_in_time: Utc::now() + Duration::seconds(offset_secs),
            queue_position,
            notes: None,
            state: PatientState::EnEsperaTaquilla,
            payment_attempts: 0,
            cashier_absence_retries: 0,
            consultation_absence_retries: 0,
            claiming_room_id: None,
        }
    }

    #[test]
    fn higher_tier_wins_regardless_of_arrival_order() {
        let high = patient("P1", Priority::High, 10, 1);
        let medium = patient("P2", Priority::Medium, 0, 0);
        let candidates = vec![&medium, &high];
        let idx = select_next(&candidates).unwrap();
        assert_eq!(candidates[idx].patient_id, "P1");
    }

    #[test]
    fn fifo_within_tier_tie_broken_by_queue_position() {
        let a = patient("A", Priority::Medium, 0, 5);
        let b = patient("B", Priority::Medium, 0, 2);
        let candidates = vec![&a, &b];
        let idx = select_next(&candidates).unwrap();
        assert_eq!(candidates[idx].patient_id, "B");
    }

    #[test]
    fn empty_candidates_select_none() {
        let candidates: Vec<&WaitingPatient> = Vec::new();
        assert!(select_next(&candidates).is_none());
    }
}
