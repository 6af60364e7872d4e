use serde_json::json;
use uuid::Uuid;
use waitqueue_core::InMemoryEventLogStore;
use waitqueue_domain::{CheckInRequest, CommandHandlers, DomainError, WaitingQueueEventKind};

type Store = InMemoryEventLogStore<WaitingQueueEventKind>;

fn check_in(handlers: &CommandHandlers<'_, Store>, queue_id: &str, patient_id: &str, priority: &str) {
    handlers
        .check_in_patient(
            queue_id,
            CheckInRequest {
                patient_id: patient_id.into(),
                patient_name: patient_id.into(),
                priority: priority.into(),
                consultation_type: "General".into(),
                notes: None,
            },
            Uuid::new_v4(),
            "nurse-1",
        )
        .unwrap();
}

#[test]
fn happy_path_check_in() {
    let store: Store = InMemoryEventLogStore::new();
    let handlers = CommandHandlers::new(&store);

    handlers
        .create_queue("Q", "Main", 20, json!({}), Uuid::new_v4(), "admin")
        .unwrap();

    let events = handlers
        .check_in_patient(
            "Q",
            CheckInRequest {
                patient_id: "P1".into(),
                patient_name: "Alice".into(),
                priority: "Medium".into(),
                consultation_type: "General".into(),
                notes: None,
            },
            Uuid::new_v4(),
            "nurse-1",
        )
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].metadata.version, 2);
    assert_eq!(events[0].event_name(), "PatientCheckedIn");
}

#[test]
fn capacity_rejection() {
    let store: Store = InMemoryEventLogStore::new();
    let handlers = CommandHandlers::new(&store);
    handlers
        .create_queue("Q", "Main", 1, json!({}), Uuid::new_v4(), "admin")
        .unwrap();
    check_in(&handlers, "Q", "P1", "Medium");

    let err = handlers
        .check_in_patient(
            "Q",
            CheckInRequest {
                patient_id: "P2".into(),
                patient_name: "Bob".into(),
                priority: "Medium".into(),
                consultation_type: "General".into(),
                notes: None,
            },
            Uuid::new_v4(),
            "nurse-1",
        )
        .unwrap_err();

    assert!(matches!(
        err,
        waitqueue_domain::CommandError::Domain(DomainError::QueueAtCapacity)
    ));
}

#[test]
fn cashier_retry_then_cancel() {
    let store: Store = InMemoryEventLogStore::new();
    let handlers = CommandHandlers::new(&store);
    handlers
        .create_queue("Q", "Main", 20, json!({}), Uuid::new_v4(), "admin")
        .unwrap();
    check_in(&handlers, "Q", "P1", "Medium");
    handlers
        .call_next_at_cashier("Q", Uuid::new_v4(), "cashier-1")
        .unwrap();

    handlers
        .mark_payment_pending("Q", "P1", Uuid::new_v4(), "cashier-1")
        .unwrap();
    handlers
        .mark_payment_pending("Q", "P1", Uuid::new_v4(), "cashier-1")
        .unwrap();
    let events = handlers
        .mark_payment_pending("Q", "P1", Uuid::new_v4(), "cashier-1")
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_name(), "PatientPaymentPending");
    assert_eq!(events[1].event_name(), "PatientCancelledByPayment");
}

#[test]
fn medical_claim_blocked_by_inactive_room() {
    let store: Store = InMemoryEventLogStore::new();
    let handlers = CommandHandlers::new(&store);
    handlers
        .create_queue("Q", "Main", 20, json!({}), Uuid::new_v4(), "admin")
        .unwrap();
    check_in(&handlers, "Q", "P1", "Medium");
    handlers
        .call_next_at_cashier("Q", Uuid::new_v4(), "cashier-1")
        .unwrap();
    handlers
        .validate_payment("Q", "P1", Uuid::new_v4(), "cashier-1")
        .unwrap();

    let err = handlers
        .claim_next_patient("Q", "R1", Uuid::new_v4(), "doctor-1")
        .unwrap_err();
    assert!(matches!(
        err,
        waitqueue_domain::CommandError::Domain(DomainError::NoActiveConsultingRoom(_))
    ));

    handlers
        .activate_consulting_room("Q", "R1", Uuid::new_v4(), "doctor-1")
        .unwrap();
    let events = handlers
        .claim_next_patient("Q", "R1", Uuid::new_v4(), "doctor-1")
        .unwrap();
    assert_eq!(events[0].event_name(), "PatientClaimedForAttention");
}
