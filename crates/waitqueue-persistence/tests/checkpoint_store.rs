mod test_support;

use chrono::Utc;
use uuid::Uuid;
use waitqueue_core::{CheckpointStore, ProjectionCheckpoint};
use waitqueue_persistence::{PgCheckpointStore, PoolProvider};

#[test]
fn save_load_and_reset_roundtrip() {
    let Some(pool) = test_support::TEST_POOL.clone() else {
        eprintln!("DATABASE_URL not set - skipping checkpoint store test");
        return;
    };
    let store = PgCheckpointStore::new(PoolProvider { pool });
    let projection_id = format!("monitor-{}", Uuid::new_v4());

    assert!(store.load_checkpoint(&projection_id).unwrap().is_none());

    store
        .save_checkpoint(&ProjectionCheckpoint {
            projection_id: projection_id.clone(),
            last_event_version: 5,
            checkpointed_at: Utc::now(),
            idempotency_key: Uuid::new_v4(),
            status: "ok".into(),
        })
        .unwrap();

    let loaded = store.load_checkpoint(&projection_id).unwrap().expect("checkpoint present");
    assert_eq!(loaded.last_event_version, 5);

    // Upsert semantics: saving again with a higher version replaces, not
    // duplicates, the row.
    store
        .save_checkpoint(&ProjectionCheckpoint {
            projection_id: projection_id.clone(),
            last_event_version: 9,
            checkpointed_at: Utc::now(),
            idempotency_key: Uuid::new_v4(),
            status: "ok".into(),
        })
        .unwrap();
    let loaded = store.load_checkpoint(&projection_id).unwrap().expect("checkpoint present");
    assert_eq!(loaded.last_event_version, 9);

    assert!(!store.has_processed(&projection_id, "evt-1").unwrap());
    store.mark_processed(&projection_id, "evt-1").unwrap();
    assert!(store.has_processed(&projection_id, "evt-1").unwrap());

    store.reset(&projection_id).unwrap();
    assert!(store.load_checkpoint(&projection_id).unwrap().is_none());
    assert!(!store.has_processed(&projection_id, "evt-1").unwrap());
}
