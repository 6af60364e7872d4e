mod test_support;

use uuid::Uuid;
use waitqueue_core::{EventLogStore, PendingEvent};
use waitqueue_domain::WaitingQueueEventKind;
use waitqueue_persistence::{PgEventStore, PoolProvider};

/// Embedded migrations must create a schema that accepts every event
/// variant, including ones with nested structures (`AttentionOutcome`).
#[test]
fn migrations_accept_every_event_variant() {
    let Some(pool) = test_support::TEST_POOL.clone() else {
        eprintln!("DATABASE_URL not set - skipping migration smoke test");
        return;
    };
    let store: PgEventStore<PoolProvider, WaitingQueueEventKind> =
        PgEventStore::new(PoolProvider { pool });

    let aggregate_id = format!("queue-{}", Uuid::new_v4());
    let kind = WaitingQueueEventKind::PatientAttentionCompleted {
        patient_id: "p-9".into(),
        outcome: waitqueue_domain::AttentionOutcome {
            summary: "resolved".into(),
            notes: Some("follow-up in 2 weeks".into()),
        },
    };

    let saved = store
        .save(
            &aggregate_id,
            0,
            vec![PendingEvent::new(kind, Uuid::new_v4(), Uuid::new_v4(), "test-runner")],
        )
        .expect("insert should satisfy schema constraints");

    assert!(matches!(saved[0].kind, WaitingQueueEventKind::PatientAttentionCompleted { .. }));
}
