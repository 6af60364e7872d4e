//! The outbox dispatcher: a single-threaded cooperative loop that polls
//! pending outbox rows, publishes them, and marks them dispatched/failed
//! (§4.3). Grounded on the Nova identity-service outbox consumer's
//! poll-batch/process/mark shape, re-expressed against this crate's
//! `OutboxStore`/`EventPublisher` traits instead of direct `sqlx`+Kafka
//! coupling, and on its `calculate_backoff` doubling-with-cap formula.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;
use waitqueue_core::{LagTracker, OutboxEntry, OutboxStore};
use waitqueue_persistence::OutboxConfig;

use crate::publisher::EventPublisher;

/// `delay = min(baseRetryDelay * 2^attempts, maxRetryDelay)` (§4.3/§6).
fn backoff_seconds(config: &OutboxConfig, attempts: u32) -> u64 {
    let scaled = config
        .base_retry_delay_seconds
        .saturating_mul(1u64.checked_shl(attempts).unwrap_or(u64::MAX));
    scaled.min(config.max_retry_delay_seconds)
}

/// Polls `store` for due outbox rows and publishes each with `publisher`,
/// repeating every `config.polling_interval_seconds` until `cancel` fires.
/// Cancellation is observed between iterations and between individual
/// entries within a batch (§5).
pub struct OutboxDispatcher<S: OutboxStore, P: EventPublisher, L: LagTracker> {
    store: Arc<S>,
    publisher: Arc<P>,
    lag_tracker: Arc<L>,
    config: OutboxConfig,
}

impl<S: OutboxStore, P: EventPublisher, L: LagTracker> OutboxDispatcher<S, P, L> {
    pub fn new(store: Arc<S>, publisher: Arc<P>, lag_tracker: Arc<L>, config: OutboxConfig) -> Self {
        Self { store, publisher, lag_tracker, config }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "dispatcher starting: polling_interval={}s batch_size={}",
            self.config.polling_interval_seconds, self.config.batch_size
        );
        loop {
            if cancel.is_cancelled() {
                info!("dispatcher stopping: cancellation observed");
                return;
            }

            if let Err(e) = self.run_single_batch(&cancel).await {
                error!("dispatcher batch failed: {e}");
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("dispatcher stopping: cancellation observed during sleep");
                    return;
                }
                _ = tokio::time::sleep(StdDuration::from_secs(self.config.polling_interval_seconds)) => {}
            }
        }
    }

    /// One poll-publish-mark cycle. Returns `Ok` even if individual entries
    /// fail to publish — those are marked `failed`/`dead_lettered`
    /// internally; only a store-level error (can't poll at all) propagates.
    /// Exposed (not just called from `run`'s loop) so callers can drive a
    /// single cycle directly, e.g. in tests.
    pub async fn run_single_batch(&self, cancel: &CancellationToken) -> Result<(), waitqueue_core::CoreError> {
        let pending = self.store.fetch_pending(self.config.batch_size)?;
        if pending.is_empty() {
            debug!("dispatcher: no pending outbox entries");
            return Ok(());
        }
        debug!("dispatcher: {} pending outbox entries", pending.len());

        for entry in pending {
            if cancel.is_cancelled() {
                return Ok(());
            }
            self.dispatch_one(entry).await;
        }
        Ok(())
    }

    async fn dispatch_one(&self, entry: OutboxEntry) {
        match self.publisher.publish(&entry).await {
            Ok(()) => {
                if let Err(e) = self.store.mark_dispatched(entry.outbox_id) {
                    error!("dispatcher: mark_dispatched failed for {}: {e}", entry.outbox_id);
                }
                if let Err(e) = self.lag_tracker.record_published(entry.event_id) {
                    error!("dispatcher: record_published failed for {}: {e}", entry.event_id);
                }
            }
            Err(e) => {
                if entry.retry_count + 1 >= self.config.max_retry_attempts {
                    warn!(
                        "dispatcher: event_id={} exceeded max_retry_attempts, dead-lettering: {e}",
                        entry.event_id
                    );
                    if let Err(store_err) =
                        self.store.mark_dead_lettered(entry.outbox_id, e.to_string())
                    {
                        error!("dispatcher: mark_dead_lettered failed for {}: {store_err}", entry.outbox_id);
                    }
                } else {
                    let delay = backoff_seconds(&self.config, entry.retry_count);
                    let next_attempt_at = Utc::now() + Duration::seconds(delay as i64);
                    warn!(
                        "dispatcher: publish failed for event_id={} (attempt {}), retrying in {delay}s: {e}",
                        entry.event_id, entry.retry_count + 1
                    );
                    if let Err(store_err) =
                        self.store.mark_failed(entry.outbox_id, e.to_string(), next_attempt_at)
                    {
                        error!("dispatcher: mark_failed failed for {}: {store_err}", entry.outbox_id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(base: u64, max: u64) -> OutboxConfig {
        OutboxConfig {
            polling_interval_seconds: 5,
            batch_size: 100,
            max_retry_attempts: 5,
            base_retry_delay_seconds: base,
            max_retry_delay_seconds: max,
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let c = cfg(30, 3600);
        assert_eq!(backoff_seconds(&c, 0), 30);
        assert_eq!(backoff_seconds(&c, 1), 60);
        assert_eq!(backoff_seconds(&c, 2), 120);
        assert_eq!(backoff_seconds(&c, 7), 3600); // 30*128=3840, capped
    }
}
