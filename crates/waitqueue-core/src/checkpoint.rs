//! Projection checkpoints and the per-projection idempotency ledger (§4.5).
//!
//! A projection's checkpoint is the last event version it has folded in;
//! rebuilding a projection means clearing its checkpoint and ledger and
//! replaying the whole log from version 0. The ledger records which
//! `idempotency_key`s a projection has already applied so a redelivered or
//! replayed event is a no-op the second time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionCheckpoint {
    pub projection_id: String,
    pub last_event_version: u64,
    pub checkpointed_at: DateTime<Utc>,
    pub idempotency_key: Uuid,
    pub status: String,
}

/// Durable state a projection needs: its checkpoint plus the idempotency
/// ledger that guards each handler against double-application.
pub trait CheckpointStore {
    fn load_checkpoint(&self, projection_id: &str) -> Result<Option<ProjectionCheckpoint>, CoreError>;

    fn save_checkpoint(&self, checkpoint: &ProjectionCheckpoint) -> Result<(), CoreError>;

    /// Clears a projection's checkpoint and idempotency ledger so the next
    /// run replays the event log from scratch.
    fn reset(&self, projection_id: &str) -> Result<(), CoreError>;

    fn has_processed(&self, projection_id: &str, idempotency_key: &str) -> Result<bool, CoreError>;

    fn mark_processed(&self, projection_id: &str, idempotency_key: &str) -> Result<(), CoreError>;
}

/// In-memory `CheckpointStore`, for tests and single-process demos.
pub struct InMemoryCheckpointStore {
    checkpoints: std::sync::Mutex<std::collections::HashMap<String, ProjectionCheckpoint>>,
    ledger: std::sync::Mutex<std::collections::HashSet<(String, String)>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            checkpoints: std::sync::Mutex::new(std::collections::HashMap::new()),
            ledger: std::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load_checkpoint(&self, projection_id: &str) -> Result<Option<ProjectionCheckpoint>, CoreError> {
        let guard = self.checkpoints.lock().expect("checkpoint mutex poisoned");
        Ok(guard.get(projection_id).cloned())
    }

    fn save_checkpoint(&self, checkpoint: &ProjectionCheckpoint) -> Result<(), CoreError> {
        let mut guard = self.checkpoints.lock().expect("checkpoint mutex poisoned");
        guard.insert(checkpoint.projection_id.clone(), checkpoint.clone());
        Ok(())
    }

    fn reset(&self, projection_id: &str) -> Result<(), CoreError> {
        self.checkpoints
            .lock()
            .expect("checkpoint mutex poisoned")
            .remove(projection_id);
        self.ledger
            .lock()
            .expect("ledger mutex poisoned")
            .retain(|(p, _)| p != projection_id);
        Ok(())
    }

    fn has_processed(&self, projection_id: &str, idempotency_key: &str) -> Result<bool, CoreError> {
        let guard = self.ledger.lock().expect("ledger mutex poisoned");
        Ok(guard.contains(&(projection_id.to_string(), idempotency_key.to_string())))
    }

    fn mark_processed(&self, projection_id: &str, idempotency_key: &str) -> Result<(), CoreError> {
        let mut guard = self.ledger.lock().expect("ledger mutex poisoned");
        guard.insert((projection_id.to_string(), idempotency_key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_processed_then_has_processed_is_true() {
        let store = InMemoryCheckpointStore::new();
        assert!(!store.has_processed("monitor", "k1").unwrap());
        store.mark_processed("monitor", "k1").unwrap();
        assert!(store.has_processed("monitor", "k1").unwrap());
    }

    #[test]
    fn reset_clears_checkpoint_and_ledger() {
        let store = InMemoryCheckpointStore::new();
        store.mark_processed("monitor", "k1").unwrap();
        store
            .save_checkpoint(&ProjectionCheckpoint {
                projection_id: "monitor".into(),
                last_event_version: 3,
                checkpointed_at: Utc::now(),
                idempotency_key: Uuid::new_v4(),
                status: "ok".into(),
            })
            .unwrap();

        store.reset("monitor").unwrap();

        assert!(store.load_checkpoint("monitor").unwrap().is_none());
        assert!(!store.has_processed("monitor", "k1").unwrap());
    }
}
