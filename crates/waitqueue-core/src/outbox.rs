//! Transactional outbox row shape and store trait.
//!
//! An outbox row is written in the same transaction as the event it mirrors
//! (§4.2 invariant 3) so that "event persisted" and "event will eventually be
//! published" are atomic. The dispatcher (`waitqueue-dispatcher`) owns
//! polling, publishing and retry/backoff; this crate only owns the row shape
//! and the store contract it polls against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Pending,
    Dispatched,
    Failed,
    DeadLettered,
}

/// One row in the outbox table, mirroring a single persisted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub outbox_id: Uuid,
    pub event_id: Uuid,
    pub aggregate_id: String,
    pub event_name: String,
    pub payload: serde_json::Value,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub idempotency_key: Uuid,
    pub status: OutboxStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
}

/// Polled by the dispatcher; written to transactionally by `EventLogStore`
/// implementations as events are saved.
pub trait OutboxStore {
    /// Rows due for (re-)publishing, oldest first, up to `limit`.
    fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEntry>, CoreError>;

    /// Marks a row as successfully published.
    fn mark_dispatched(&self, outbox_id: Uuid) -> Result<(), CoreError>;

    /// Marks a row as failed; `next_attempt_at` should already reflect the
    /// caller's backoff policy. Once `retry_count` exceeds the configured
    /// max it is the caller's responsibility to call `mark_dead_lettered`
    /// instead.
    fn mark_failed(
        &self,
        outbox_id: Uuid,
        error: String,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), CoreError>;

    /// Marks a row as permanently failed (poison message).
    fn mark_dead_lettered(&self, outbox_id: Uuid, error: String) -> Result<(), CoreError>;
}

/// In-memory `OutboxStore`, for tests and single-process demos.
pub struct InMemoryOutboxStore {
    inner: std::sync::Mutex<Vec<OutboxEntry>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Used by `InMemoryEventLogStore`-backed test harnesses to enqueue a row
    /// alongside a saved event, mirroring the atomic insert a real
    /// transaction performs.
    pub fn enqueue(&self, entry: OutboxEntry) {
        self.inner.lock().expect("outbox mutex poisoned").push(entry);
    }
}

impl Default for InMemoryOutboxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboxStore for InMemoryOutboxStore {
    fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEntry>, CoreError> {
        let guard = self.inner.lock().expect("outbox mutex poisoned");
        let now = Utc::now();
        Ok(guard
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending && e.next_attempt_at <= now)
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_dispatched(&self, outbox_id: Uuid) -> Result<(), CoreError> {
        let mut guard = self.inner.lock().expect("outbox mutex poisoned");
        let entry = guard
            .iter_mut()
            .find(|e| e.outbox_id == outbox_id)
            .ok_or_else(|| CoreError::NotFound(outbox_id.to_string()))?;
        entry.status = OutboxStatus::Dispatched;
        Ok(())
    }

    fn mark_failed(
        &self,
        outbox_id: Uuid,
        error: String,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let mut guard = self.inner.lock().expect("outbox mutex poisoned");
        let entry = guard
            .iter_mut()
            .find(|e| e.outbox_id == outbox_id)
            .ok_or_else(|| CoreError::NotFound(outbox_id.to_string()))?;
        entry.retry_count += 1;
        entry.last_error = Some(error);
        entry.next_attempt_at = next_attempt_at;
        Ok(())
    }

    fn mark_dead_lettered(&self, outbox_id: Uuid, error: String) -> Result<(), CoreError> {
        let mut guard = self.inner.lock().expect("outbox mutex poisoned");
        let entry = guard
            .iter_mut()
            .find(|e| e.outbox_id == outbox_id)
            .ok_or_else(|| CoreError::NotFound(outbox_id.to_string()))?;
        entry.status = OutboxStatus::DeadLettered;
        entry.last_error = Some(error);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: OutboxStatus) -> OutboxEntry {
        OutboxEntry {
            outbox_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            aggregate_id: "agg-1".into(),
            event_name: "patient_checked_in".to_string(),
            payload: serde_json::json!({}),
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            idempotency_key: Uuid::new_v4(),
            status,
            retry_count: 0,
            last_error: None,
            created_at: Utc::now(),
            next_attempt_at: Utc::now(),
        }
    }

    #[test]
    fn fetch_pending_skips_dispatched_rows() {
        let store = InMemoryOutboxStore::new();
        store.enqueue(entry(OutboxStatus::Pending));
        store.enqueue(entry(OutboxStatus::Dispatched));

        let pending = store.fetch_pending(10).unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn mark_failed_increments_retry_count() {
        let store = InMemoryOutboxStore::new();
        let row = entry(OutboxStatus::Pending);
        let id = row.outbox_id;
        store.enqueue(row);

        store
            .mark_failed(id, "boom".into(), Utc::now())
            .unwrap();

        let pending = store.fetch_pending(10).unwrap();
        assert_eq!(pending[0].retry_count, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("boom"));
    }
}
