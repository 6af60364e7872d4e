//! Postgres (Diesel) implementations of the `waitqueue-core` storage traits.
//!
//! Goals:
//! - Durable persistence with 1:1 parity against the in-memory backends used
//!   in `waitqueue-domain`'s and `waitqueue-core`'s own tests: replay must
//!   reconstruct the same state either way.
//! - The event-persist-plus-outbox-enqueue invariant (§4.2 invariant 3) is a
//!   single Diesel transaction: if either insert fails, both roll back.
//! - Isolate the domain ↔ DB-row mapping from `waitqueue-core` entirely; this
//!   module only knows JSON payloads and `EventKind::event_name()`.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use serde_json::Value;
use uuid::Uuid;

use log::warn;

use waitqueue_core::{
    CheckpointStore, CoreError, DomainEvent, EventKind, EventLogStore, EventMetadata, LagTracker,
    OutboxEntry, OutboxStatus, OutboxStore, PendingEvent, ProjectionCheckpoint,
};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{event_log, idempotency_keys, lag_entries, outbox, projection_checkpoints};

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Abstract connection source, so a unit test can swap in a fake pool
/// without pulling in r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Is this error worth retrying with backoff? Covers serialization conflicts
/// (concurrent writers on the same aggregate) and transient connection
/// drops; never retries constraint violations or not-found.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
                || m.contains("could not serialize access due to concurrent update")
                || m.contains("terminating connection due to administrator command")
                || m.contains("connection closed")
                || m.contains("connection refused")
                || m.contains("timeout")
        }
        _ => false,
    }
}

fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
where
    F: FnMut() -> Result<T, PersistenceError>,
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!(
                    "retryable persistence error (attempt {}): {:?} -> sleeping {}ms",
                    attempts + 1,
                    e,
                    delay_ms
                );
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

// --- event_log ---------------------------------------------------------

#[derive(Insertable, Debug)]
#[diesel(table_name = event_log)]
struct NewEventRow<'a> {
    aggregate_id: &'a str,
    version: i64,
    event_id: Uuid,
    event_name: &'a str,
    payload: Value,
    metadata: Value,
    idempotency_key: Uuid,
    occurred_at: DateTime<Utc>,
}

#[derive(Queryable, Debug)]
struct EventRow {
    #[allow(dead_code)]
    aggregate_id: String,
    #[allow(dead_code)]
    version: i64,
    #[allow(dead_code)]
    event_id: Uuid,
    #[allow(dead_code)]
    event_name: String,
    payload: Value,
    metadata: Value,
    #[allow(dead_code)]
    idempotency_key: Uuid,
    #[allow(dead_code)]
    global_seq: i64,
    #[allow(dead_code)]
    occurred_at: DateTime<Utc>,
}

fn deserialize_event<K: EventKind>(row: EventRow) -> Result<DomainEvent<K>, CoreError> {
    let kind: K = serde_json::from_value(row.payload)
        .map_err(|e| CoreError::Internal(format!("corrupt event payload: {e}")))?;
    let metadata: EventMetadata = serde_json::from_value(row.metadata)
        .map_err(|e| CoreError::Internal(format!("corrupt event metadata: {e}")))?;
    Ok(DomainEvent { kind, metadata })
}

/// One row queued alongside a saved event, inserted in the same transaction
/// (§4.2 invariant 3).
#[derive(Insertable, Debug)]
#[diesel(table_name = outbox)]
struct NewOutboxRow<'a> {
    outbox_id: Uuid,
    event_id: Uuid,
    aggregate_id: &'a str,
    event_name: &'a str,
    payload: Value,
    correlation_id: Uuid,
    causation_id: Uuid,
    idempotency_key: Uuid,
    status: &'static str,
    retry_count: i32,
    next_attempt_at: DateTime<Utc>,
}

/// What a successful `save` transaction produced, or the concurrency
/// mismatch it detected — kept out of the `Err` channel so `with_retry`
/// only ever sees genuinely-transient `PersistenceError`s.
enum SaveOutcome<K: EventKind> {
    Saved(Vec<DomainEvent<K>>),
    Conflict { expected: u64, found: u64 },
}

/// `EventLogStore<K>` backed by Postgres, generic over the aggregate's event
/// vocabulary so every aggregate type in the service can share one
/// connection pool and one table.
pub struct PgEventStore<P: ConnectionProvider, K: EventKind> {
    provider: P,
    _kind: PhantomData<K>,
}

impl<P: ConnectionProvider, K: EventKind> PgEventStore<P, K> {
    pub fn new(provider: P) -> Self {
        Self { provider, _kind: PhantomData }
    }
}

impl<P: ConnectionProvider, K: EventKind> EventLogStore<K> for PgEventStore<P, K> {
    fn load(&self, aggregate_id: &str) -> Result<Vec<DomainEvent<K>>, CoreError> {
        let rows: Vec<EventRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            event_log::table
                .filter(event_log::aggregate_id.eq(aggregate_id))
                .order(event_log::version.asc())
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;

        rows.into_iter().map(deserialize_event).collect()
    }

    fn stream_all(&self) -> Result<Vec<DomainEvent<K>>, CoreError> {
        let rows: Vec<EventRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            event_log::table
                .order(event_log::global_seq.asc())
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;

        rows.into_iter().map(deserialize_event).collect()
    }

    fn save(
        &self,
        aggregate_id: &str,
        expected_version: u64,
        pending: Vec<PendingEvent<K>>,
    ) -> Result<Vec<DomainEvent<K>>, CoreError> {
        let outcome = with_retry(|| -> Result<SaveOutcome<K>, PersistenceError> {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx_conn| {
                    let found: i64 = event_log::table
                        .filter(event_log::aggregate_id.eq(aggregate_id))
                        .count()
                        .get_result(tx_conn)?;
                    if found as u64 != expected_version {
                        return Ok(SaveOutcome::Conflict { expected: expected_version, found: found as u64 });
                    }

                    let now = Utc::now();
                    let mut saved = Vec::with_capacity(pending.len());
                    for (offset, pending_event) in pending.into_iter().enumerate() {
                        let version = expected_version + offset as u64 + 1;
                        let metadata = EventMetadata {
                            event_id: Uuid::new_v4(),
                            aggregate_id: aggregate_id.to_string(),
                            version,
                            correlation_id: pending_event.correlation_id,
                            causation_id: pending_event.causation_id,
                            actor: pending_event.actor,
                            occurred_at: now,
                            idempotency_key: Uuid::new_v4(),
                            schema_version: 1,
                        };
                        let event_name = pending_event.kind.event_name();
                        let payload = serde_json::to_value(&pending_event.kind)
                            .expect("serialize event kind");
                        let metadata_json =
                            serde_json::to_value(&metadata).expect("serialize event metadata");

                        diesel::insert_into(event_log::table)
                            .values(NewEventRow {
                                aggregate_id,
                                version: version as i64,
                                event_id: metadata.event_id,
                                event_name,
                                payload: payload.clone(),
                                metadata: metadata_json,
                                idempotency_key: metadata.idempotency_key,
                                occurred_at: metadata.occurred_at,
                            })
                            .execute(tx_conn)?;

                        diesel::insert_into(outbox::table)
                            .values(NewOutboxRow {
                                outbox_id: Uuid::new_v4(),
                                event_id: metadata.event_id,
                                aggregate_id,
                                event_name,
                                payload,
                                correlation_id: metadata.correlation_id,
                                causation_id: metadata.causation_id,
                                idempotency_key: metadata.idempotency_key,
                                status: "pending",
                                retry_count: 0,
                                next_attempt_at: now,
                            })
                            .execute(tx_conn)?;

                        diesel::insert_into(lag_entries::table)
                            .values((
                                lag_entries::event_id.eq(metadata.event_id),
                                lag_entries::event_name.eq(event_name),
                                lag_entries::aggregate_id.eq(aggregate_id),
                                lag_entries::created_at.eq(now),
                                lag_entries::status.eq("created"),
                            ))
                            .execute(tx_conn)?;

                        saved.push(DomainEvent { kind: pending_event.kind, metadata });
                    }
                    Ok(SaveOutcome::Saved(saved))
                })
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;

        match outcome {
            SaveOutcome::Saved(events) => Ok(events),
            SaveOutcome::Conflict { expected, found } => {
                Err(CoreError::ConcurrencyConflict { expected, found })
            }
        }
    }
}

// --- outbox --------------------------------------------------------------

#[derive(Queryable, Debug)]
struct OutboxRow {
    outbox_id: Uuid,
    event_id: Uuid,
    aggregate_id: String,
    event_name: String,
    payload: Value,
    correlation_id: Uuid,
    causation_id: Uuid,
    idempotency_key: Uuid,
    status: String,
    retry_count: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    next_attempt_at: DateTime<Utc>,
}

fn status_str(status: OutboxStatus) -> &'static str {
    match status {
        OutboxStatus::Pending => "pending",
        OutboxStatus::Dispatched => "dispatched",
        OutboxStatus::Failed => "failed",
        OutboxStatus::DeadLettered => "dead_lettered",
    }
}

fn parse_status(s: &str) -> Result<OutboxStatus, CoreError> {
    match s {
        "pending" => Ok(OutboxStatus::Pending),
        "dispatched" => Ok(OutboxStatus::Dispatched),
        "failed" => Ok(OutboxStatus::Failed),
        "dead_lettered" => Ok(OutboxStatus::DeadLettered),
        other => Err(CoreError::Internal(format!("unknown outbox status {other}"))),
    }
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = CoreError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(OutboxEntry {
            outbox_id: row.outbox_id,
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_name: row.event_name,
            payload: row.payload,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            idempotency_key: row.idempotency_key,
            status: parse_status(&row.status)?,
            retry_count: row.retry_count as u32,
            last_error: row.last_error,
            created_at: row.created_at,
            next_attempt_at: row.next_attempt_at,
        })
    }
}

pub struct PgOutboxStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgOutboxStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> OutboxStore for PgOutboxStore<P> {
    fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEntry>, CoreError> {
        let now = Utc::now();
        let rows: Vec<OutboxRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            outbox::table
                .filter(outbox::status.eq("pending"))
                .filter(outbox::next_attempt_at.le(now))
                .order(outbox::created_at.asc())
                .limit(limit as i64)
                .load(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;

        rows.into_iter().map(OutboxEntry::try_from).collect()
    }

    fn mark_dispatched(&self, outbox_id: Uuid) -> Result<(), CoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(outbox::table.filter(outbox::outbox_id.eq(outbox_id)))
                .set(outbox::status.eq(status_str(OutboxStatus::Dispatched)))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(())
    }

    fn mark_failed(
        &self,
        outbox_id: Uuid,
        error: String,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(outbox::table.filter(outbox::outbox_id.eq(outbox_id)))
                .set((
                    outbox::retry_count.eq(outbox::retry_count + 1),
                    outbox::last_error.eq(Some(error.clone())),
                    outbox::next_attempt_at.eq(next_attempt_at),
                ))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(())
    }

    fn mark_dead_lettered(&self, outbox_id: Uuid, error: String) -> Result<(), CoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::update(outbox::table.filter(outbox::outbox_id.eq(outbox_id)))
                .set((
                    outbox::status.eq(status_str(OutboxStatus::DeadLettered)),
                    outbox::last_error.eq(Some(error.clone())),
                ))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(())
    }
}

// --- lag tracking (§4.6) --------------------------------------------------

/// Aggregate dispatch/processing lag, queried by an operator dashboard.
#[derive(Debug, Clone, Default)]
pub struct LagStatistics {
    pub created_count: i64,
    pub published_count: i64,
    pub processed_count: i64,
    pub avg_total_lag_ms: Option<f64>,
    pub p50_total_lag_ms: Option<i64>,
    pub p95_total_lag_ms: Option<i64>,
    pub p99_total_lag_ms: Option<i64>,
    pub max_total_lag_ms: Option<i64>,
}

/// Nearest-rank percentile of an already-sorted slice. `p` is in `[0, 1]`.
fn percentile(sorted: &[i64], p: f64) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted.get(rank.min(sorted.len() - 1)).copied()
}

pub struct PgLagTracker<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgLagTracker<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Inserts the CREATED row. Uses `ON CONFLICT DO NOTHING` on the primary
    /// key so a record that already moved to published/processed (a
    /// reordering the dispatcher should never produce, but persistence
    /// shouldn't assume) is never clobbered back to "created".
    pub fn record_created(
        &self,
        event_id: Uuid,
        event_name: &str,
        aggregate_id: &str,
    ) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(lag_entries::table)
                .values((
                    lag_entries::event_id.eq(event_id),
                    lag_entries::event_name.eq(event_name),
                    lag_entries::aggregate_id.eq(aggregate_id),
                    lag_entries::created_at.eq(Utc::now()),
                    lag_entries::status.eq("created"),
                ))
                .on_conflict(lag_entries::event_id)
                .do_nothing()
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    /// Records the PUBLISHED timestamp and derives `dispatch_duration_ms`
    /// from `created_at`. The subtraction happens via `chrono::Duration`
    /// (i64 milliseconds) before it ever touches a narrower column type, so
    /// a long-idle outbox row can't silently truncate its own lag figure.
    pub fn record_published(&self, event_id: Uuid) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let created_at: DateTime<Utc> = lag_entries::table
                .filter(lag_entries::event_id.eq(event_id))
                .select(lag_entries::created_at)
                .first(&mut conn)?;
            let now = Utc::now();
            let dispatch_duration_ms = (now - created_at).num_milliseconds();

            diesel::update(
                lag_entries::table
                    .filter(lag_entries::event_id.eq(event_id))
                    .filter(lag_entries::status.eq("created")),
            )
            .set((
                lag_entries::published_at.eq(now),
                lag_entries::dispatch_duration_ms.eq(dispatch_duration_ms),
                lag_entries::status.eq("published"),
            ))
            .execute(&mut conn)
            .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    /// Records the PROCESSED timestamp and derives both
    /// `processing_duration_ms` (since publish) and `total_lag_ms` (since
    /// creation), same wide-integer-first rule as `record_published`. The
    /// `status != "processed"` guard makes a replayed/redelivered event a
    /// no-op on lag metrics, same as it already is on the projected views.
    pub fn record_processed(&self, event_id: Uuid) -> Result<(), PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let (created_at, published_at): (DateTime<Utc>, Option<DateTime<Utc>>) = lag_entries::table
                .filter(lag_entries::event_id.eq(event_id))
                .select((lag_entries::created_at, lag_entries::published_at))
                .first(&mut conn)?;
            let now = Utc::now();
            let reference = published_at.unwrap_or(created_at);
            let processing_duration_ms = (now - reference).num_milliseconds();
            let total_lag_ms = (now - created_at).num_milliseconds();

            diesel::update(
                lag_entries::table
                    .filter(lag_entries::event_id.eq(event_id))
                    .filter(lag_entries::status.ne("processed")),
            )
            .set((
                lag_entries::processed_at.eq(now),
                lag_entries::processing_duration_ms.eq(processing_duration_ms),
                lag_entries::total_lag_ms.eq(total_lag_ms),
                lag_entries::status.eq("processed"),
            ))
            .execute(&mut conn)
            .map_err(PersistenceError::from)
        })?;
        Ok(())
    }

    /// §4.6 `statistics(eventName, from?, to?)`. `from`/`to` bound
    /// `created_at`; all four counts and the lag figures are scoped to the
    /// same `eventName`/time-window filter.
    pub fn statistics(
        &self,
        event_name: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<LagStatistics, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;

            let filtered = || {
                let mut query = lag_entries::table.into_boxed();
                if let Some(name) = event_name {
                    query = query.filter(lag_entries::event_name.eq(name.to_string()));
                }
                if let Some(from) = from {
                    query = query.filter(lag_entries::created_at.ge(from));
                }
                if let Some(to) = to {
                    query = query.filter(lag_entries::created_at.le(to));
                }
                query
            };

            let created_count: i64 = filtered().count().get_result(&mut conn)?;
            let published_count: i64 = filtered()
                .filter(lag_entries::published_at.is_not_null())
                .count()
                .get_result(&mut conn)?;
            let processed_count: i64 = filtered()
                .filter(lag_entries::processed_at.is_not_null())
                .count()
                .get_result(&mut conn)?;
            let mut lags: Vec<i64> = filtered()
                .filter(lag_entries::total_lag_ms.is_not_null())
                .select(lag_entries::total_lag_ms.assume_not_null())
                .load(&mut conn)?;
            lags.sort_unstable();

            let avg_total_lag_ms = if lags.is_empty() {
                None
            } else {
                Some(lags.iter().sum::<i64>() as f64 / lags.len() as f64)
            };
            let max_total_lag_ms = lags.last().copied();

            Ok(LagStatistics {
                created_count,
                published_count,
                processed_count,
                avg_total_lag_ms,
                p50_total_lag_ms: percentile(&lags, 0.50),
                p95_total_lag_ms: percentile(&lags, 0.95),
                p99_total_lag_ms: percentile(&lags, 0.99),
                max_total_lag_ms,
            })
        })
    }
}

impl<P: ConnectionProvider> LagTracker for PgLagTracker<P> {
    fn record_published(&self, event_id: Uuid) -> Result<(), CoreError> {
        PgLagTracker::record_published(self, event_id).map_err(CoreError::from)
    }

    fn record_processed(&self, event_id: Uuid) -> Result<(), CoreError> {
        PgLagTracker::record_processed(self, event_id).map_err(CoreError::from)
    }
}

// --- projection checkpoints + idempotency ledger (§4.5) -------------------

#[derive(Queryable, Debug)]
struct CheckpointRow {
    projection_id: String,
    last_event_version: i64,
    checkpointed_at: DateTime<Utc>,
    idempotency_key: Uuid,
    status: String,
}

impl From<CheckpointRow> for ProjectionCheckpoint {
    fn from(row: CheckpointRow) -> Self {
        ProjectionCheckpoint {
            projection_id: row.projection_id,
            last_event_version: row.last_event_version as u64,
            checkpointed_at: row.checkpointed_at,
            idempotency_key: row.idempotency_key,
            status: row.status,
        }
    }
}

pub struct PgCheckpointStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgCheckpointStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> CheckpointStore for PgCheckpointStore<P> {
    fn load_checkpoint(&self, projection_id: &str) -> Result<Option<ProjectionCheckpoint>, CoreError> {
        let row: Option<CheckpointRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            projection_checkpoints::table
                .filter(projection_checkpoints::projection_id.eq(projection_id))
                .first(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(row.map(ProjectionCheckpoint::from))
    }

    fn save_checkpoint(&self, checkpoint: &ProjectionCheckpoint) -> Result<(), CoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(projection_checkpoints::table)
                .values((
                    projection_checkpoints::projection_id.eq(&checkpoint.projection_id),
                    projection_checkpoints::last_event_version.eq(checkpoint.last_event_version as i64),
                    projection_checkpoints::checkpointed_at.eq(checkpoint.checkpointed_at),
                    projection_checkpoints::idempotency_key.eq(checkpoint.idempotency_key),
                    projection_checkpoints::status.eq(&checkpoint.status),
                ))
                .on_conflict(projection_checkpoints::projection_id)
                .do_update()
                .set((
                    projection_checkpoints::last_event_version.eq(checkpoint.last_event_version as i64),
                    projection_checkpoints::checkpointed_at.eq(checkpoint.checkpointed_at),
                    projection_checkpoints::idempotency_key.eq(checkpoint.idempotency_key),
                    projection_checkpoints::status.eq(&checkpoint.status),
                ))
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(())
    }

    fn reset(&self, projection_id: &str) -> Result<(), CoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx_conn| {
                    diesel::delete(
                        projection_checkpoints::table
                            .filter(projection_checkpoints::projection_id.eq(projection_id)),
                    )
                    .execute(tx_conn)?;
                    diesel::delete(
                        idempotency_keys::table
                            .filter(idempotency_keys::projection_id.eq(projection_id)),
                    )
                    .execute(tx_conn)?;
                    Ok::<(), diesel::result::Error>(())
                })
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(())
    }

    fn has_processed(&self, projection_id: &str, idempotency_key: &str) -> Result<bool, CoreError> {
        let row: Option<String> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            idempotency_keys::table
                .filter(idempotency_keys::projection_id.eq(projection_id))
                .filter(idempotency_keys::idempotency_key.eq(idempotency_key))
                .select(idempotency_keys::idempotency_key)
                .first(&mut conn)
                .optional()
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(row.is_some())
    }

    fn mark_processed(&self, projection_id: &str, idempotency_key: &str) -> Result<(), CoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(idempotency_keys::table)
                .values((
                    idempotency_keys::projection_id.eq(projection_id),
                    idempotency_keys::idempotency_key.eq(idempotency_key),
                    idempotency_keys::processed_at.eq(Utc::now()),
                ))
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        })
        .map_err(CoreError::from)?;
        Ok(())
    }
}

// --- pool bootstrap --------------------------------------------------------

pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), clamping min=max", validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .min_idle(Some(final_min))
        .max_size(validated_max)
        .build(manager)
        .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
