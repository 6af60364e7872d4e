mod test_support;

use uuid::Uuid;
use waitqueue_core::{EventLogStore, OutboxStore, PendingEvent};
use waitqueue_domain::WaitingQueueEventKind;
use waitqueue_persistence::{PgEventStore, PgOutboxStore, PoolProvider};

/// §4.2 invariant 3: every saved event has exactly one matching outbox row,
/// inserted in the same transaction.
#[test]
fn saving_an_event_enqueues_exactly_one_outbox_row() {
    let Some(pool) = test_support::TEST_POOL.clone() else {
        eprintln!("DATABASE_URL not set - skipping outbox atomicity test");
        return;
    };
    let event_store: PgEventStore<PoolProvider, WaitingQueueEventKind> =
        PgEventStore::new(PoolProvider { pool: pool.clone() });
    let outbox_store = PgOutboxStore::new(PoolProvider { pool });

    let aggregate_id = format!("queue-{}", Uuid::new_v4());
    let saved = event_store
        .save(
            &aggregate_id,
            0,
            vec![PendingEvent::new(
                WaitingQueueEventKind::ConsultingRoomActivated { room_id: "room-2".into() },
                Uuid::new_v4(),
                Uuid::new_v4(),
                "test-runner",
            )],
        )
        .expect("save event");

    let pending = outbox_store.fetch_pending(1000).expect("fetch pending");
    let matches: Vec<_> = pending
        .iter()
        .filter(|row| row.event_id == saved[0].metadata.event_id)
        .collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].aggregate_id, aggregate_id);

    outbox_store.mark_dispatched(matches[0].outbox_id).expect("mark dispatched");
    let still_pending = outbox_store.fetch_pending(1000).expect("fetch pending again");
    assert!(!still_pending.iter().any(|row| row.outbox_id == matches[0].outbox_id));
}
