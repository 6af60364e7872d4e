mod test_support;

use uuid::Uuid;
use waitqueue_core::{EventLogStore, PendingEvent};
use waitqueue_domain::WaitingQueueEventKind;
use waitqueue_persistence::{PgEventStore, PgLagTracker, PoolProvider};

/// Regression test for the "CREATED insert must not overwrite a later
/// status" rule: `record_created` runs again for an event already marked
/// published, and must leave it published.
#[test]
fn record_created_does_not_clobber_a_later_status() {
    let Some(pool) = test_support::TEST_POOL.clone() else {
        eprintln!("DATABASE_URL not set - skipping lag tracker test");
        return;
    };
    let event_store: PgEventStore<PoolProvider, WaitingQueueEventKind> =
        PgEventStore::new(PoolProvider { pool: pool.clone() });
    let tracker = PgLagTracker::new(PoolProvider { pool });

    let aggregate_id = format!("queue-{}", Uuid::new_v4());
    let saved = event_store
        .save(
            &aggregate_id,
            0,
            vec![PendingEvent::new(
                WaitingQueueEventKind::ConsultingRoomActivated { room_id: "room-3".into() },
                Uuid::new_v4(),
                Uuid::new_v4(),
                "test-runner",
            )],
        )
        .expect("save event (creates the lag_entries row as a side effect)");
    let event_id = saved[0].metadata.event_id;

    tracker.record_published(event_id).expect("record published");
    // A redundant CREATED insert (e.g. a retried producer) must not regress
    // the row back to "created".
    tracker
        .record_created(event_id, "ConsultingRoomActivated", &aggregate_id)
        .expect("redundant record_created");

    tracker.record_processed(event_id).expect("record processed");
    // A redelivered event re-running record_processed must be a no-op on
    // lag metrics, same as it already is on the projected views.
    tracker.record_processed(event_id).expect("redundant record_processed");

    let stats = tracker.statistics(None, None, None).expect("statistics");
    assert!(stats.processed_count >= 1);
    assert!(stats.max_total_lag_ms.unwrap_or(0) >= 0);
}
