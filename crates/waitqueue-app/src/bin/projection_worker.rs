//! Projection worker process (§6: "three independently runnable
//! processes"). Continuously folds the event log into the four read views.
//!
//! §4.5 describes a bus subscriber dispatching to typed handlers, but the
//! outbox row's own shape (spec.md's literal Outbox entry definition, §4.2)
//! carries no `version`/`actor`/`schemaVersion`, so a bus message alone
//! can't reconstitute a full `DomainEvent` for typed dispatch. Since
//! projection correctness depends only on processing the log in total
//! order idempotently — exactly what `ProjectionEngine::process`/`rebuild`
//! already guarantee via `streamAll()` — this worker polls the event log
//! directly instead of standing up a second bus consumer stack; dispatcher
//! publish timing only matters to external subscribers, not to this core.

use std::time::Duration;

use log::{error, info};
use tokio_util::sync::CancellationToken;
use waitqueue_app::CompositionRoot;
use waitqueue_core::EventLogStore;
use waitqueue_persistence::{PgCheckpointStore, PgLagTracker, PoolProvider};
use waitqueue_projections::ProjectionEngine;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    env_logger::init();

    let root = CompositionRoot::from_env().expect("composition root: failed to connect to database");
    let checkpoints = PgCheckpointStore::new(PoolProvider { pool: root.pool.clone() });
    let lag_tracker = PgLagTracker::new(PoolProvider { pool: root.pool.clone() });
    let mut engine = ProjectionEngine::new(checkpoints, lag_tracker);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("projection worker: shutdown signal received");
        shutdown.cancel();
    });

    info!("projection worker starting: poll_interval={}s", POLL_INTERVAL.as_secs());
    loop {
        if cancel.is_cancelled() {
            info!("projection worker stopping: cancellation observed");
            return;
        }

        match root.event_store.stream_all() {
            Ok(events) => {
                for event in &events {
                    if let Err(e) = engine.process(event) {
                        error!("projection worker: failed to process event {}: {e}", event.metadata.event_id);
                    }
                }
            }
            Err(e) => error!("projection worker: failed to stream events: {e}"),
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("projection worker stopping: cancellation observed during sleep");
                return;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}
