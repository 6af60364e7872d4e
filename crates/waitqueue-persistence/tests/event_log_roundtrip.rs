mod test_support;

use uuid::Uuid;
use waitqueue_core::{EventLogStore, PendingEvent};
use waitqueue_domain::WaitingQueueEventKind;
use waitqueue_persistence::{PgEventStore, PoolProvider};

#[test]
fn save_then_load_roundtrips_in_version_order() {
    let Some(pool) = test_support::TEST_POOL.clone() else {
        eprintln!("DATABASE_URL not set - skipping event log roundtrip test");
        return;
    };
    let store: PgEventStore<PoolProvider, WaitingQueueEventKind> =
        PgEventStore::new(PoolProvider { pool });

    let aggregate_id = format!("queue-{}", Uuid::new_v4());
    let created = PendingEvent::new(
        WaitingQueueEventKind::WaitingQueueCreated {
            queue_name: "General".into(),
            max_capacity: 50,
            metadata: serde_json::json!({}),
        },
        Uuid::new_v4(),
        Uuid::new_v4(),
        "test-runner",
    );
    let checked_in = PendingEvent::new(
        WaitingQueueEventKind::PatientCheckedIn {
            patient_id: "p-1".into(),
            patient_name: "Ana".into(),
            priority: waitqueue_domain::Priority::Medium,
            consultation_type: "general checkup".into(),
            check_in_time: chrono::Utc::now(),
            queue_position: 1,
            notes: None,
        },
        Uuid::new_v4(),
        Uuid::new_v4(),
        "test-runner",
    );

    store.save(&aggregate_id, 0, vec![created]).expect("save created");
    store.save(&aggregate_id, 1, vec![checked_in]).expect("save checked-in");

    let history = store.load(&aggregate_id).expect("load history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].metadata.version, 1);
    assert_eq!(history[1].metadata.version, 2);
    assert!(matches!(history[0].kind, WaitingQueueEventKind::WaitingQueueCreated { .. }));
    assert!(matches!(history[1].kind, WaitingQueueEventKind::PatientCheckedIn { .. }));
}
