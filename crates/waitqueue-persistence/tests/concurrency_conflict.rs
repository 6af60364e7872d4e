mod test_support;

use uuid::Uuid;
use waitqueue_core::{CoreError, EventLogStore, PendingEvent};
use waitqueue_domain::WaitingQueueEventKind;
use waitqueue_persistence::{PgEventStore, PoolProvider};

#[test]
fn stale_expected_version_is_rejected() {
    let Some(pool) = test_support::TEST_POOL.clone() else {
        eprintln!("DATABASE_URL not set - skipping concurrency conflict test");
        return;
    };
    let store: PgEventStore<PoolProvider, WaitingQueueEventKind> =
        PgEventStore::new(PoolProvider { pool });

    let aggregate_id = format!("queue-{}", Uuid::new_v4());
    let event = || {
        PendingEvent::new(
            WaitingQueueEventKind::ConsultingRoomActivated { room_id: "room-1".into() },
            Uuid::new_v4(),
            Uuid::new_v4(),
            "test-runner",
        )
    };

    store.save(&aggregate_id, 0, vec![event()]).expect("first save succeeds");

    let err = store
        .save(&aggregate_id, 0, vec![event()])
        .expect_err("stale expected_version must be rejected");

    assert_eq!(
        err,
        CoreError::ConcurrencyConflict { expected: 0, found: 1 }
    );
}
