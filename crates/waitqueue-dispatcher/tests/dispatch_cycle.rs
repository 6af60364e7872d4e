use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use waitqueue_core::{InMemoryLagTracker, InMemoryOutboxStore, OutboxEntry, OutboxStatus, OutboxStore};
use waitqueue_dispatcher::{DispatchError, EventPublisher, OutboxDispatcher};
use waitqueue_persistence::OutboxConfig;

struct CountingPublisher {
    calls: AtomicUsize,
    fail_first: bool,
}

#[async_trait]
impl EventPublisher for CountingPublisher {
    async fn publish(&self, _entry: &OutboxEntry) -> Result<(), DispatchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && n == 0 {
            return Err(DispatchError::Publish("simulated failure".into()));
        }
        Ok(())
    }
}

fn entry(event_name: &str) -> OutboxEntry {
    OutboxEntry {
        outbox_id: Uuid::new_v4(),
        event_id: Uuid::new_v4(),
        aggregate_id: "queue-1".into(),
        event_name: event_name.into(),
        payload: serde_json::json!({}),
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        idempotency_key: Uuid::new_v4(),
        status: OutboxStatus::Pending,
        retry_count: 0,
        last_error: None,
        created_at: Utc::now(),
        next_attempt_at: Utc::now(),
    }
}

fn config() -> OutboxConfig {
    OutboxConfig {
        polling_interval_seconds: 1,
        batch_size: 10,
        max_retry_attempts: 5,
        base_retry_delay_seconds: 30,
        max_retry_delay_seconds: 3600,
    }
}

#[tokio::test]
async fn a_successful_publish_marks_the_entry_dispatched() {
    let store = Arc::new(InMemoryOutboxStore::new());
    store.enqueue(entry("PatientCheckedIn"));
    let publisher = Arc::new(CountingPublisher { calls: AtomicUsize::new(0), fail_first: false });
    let lag_tracker = Arc::new(InMemoryLagTracker::new());

    let dispatcher = OutboxDispatcher::new(store.clone(), publisher.clone(), lag_tracker.clone(), config());
    let cancel = CancellationToken::new();
    let event_id = store.fetch_pending(10).unwrap()[0].event_id;
    dispatcher.run_single_batch(&cancel).await.expect("batch runs");

    assert!(store.fetch_pending(10).unwrap().is_empty());
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
    assert!(lag_tracker.was_published(event_id));
}

#[tokio::test]
async fn a_failed_publish_schedules_a_retry_with_backoff() {
    let store = Arc::new(InMemoryOutboxStore::new());
    store.enqueue(entry("PatientCheckedIn"));
    let publisher = Arc::new(CountingPublisher { calls: AtomicUsize::new(0), fail_first: true });
    let lag_tracker = Arc::new(InMemoryLagTracker::new());

    let dispatcher = OutboxDispatcher::new(store.clone(), publisher.clone(), lag_tracker, config());
    let cancel = CancellationToken::new();
    dispatcher.run_single_batch(&cancel).await.expect("batch runs");

    // The entry is rescheduled into the future, so it no longer shows up as
    // due immediately.
    assert!(store.fetch_pending(10).unwrap().is_empty());
}
