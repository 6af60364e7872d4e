//! Diesel schema (hand-written, mirroring the teacher's manually-maintained
//! `schema.rs`; replaceable with `diesel print-schema`).
//!
//! Tables:
//! - `event_log`: append-only event log, primary key `(aggregate_id,
//!   version)`.
//! - `outbox`: transactional outbox rows, one per event.
//! - `lag_entries`: CREATED/PUBLISHED/PROCESSED timestamps per event (§4.6).
//! - `projection_checkpoints`: one row per projection, tracks
//!   `lastEventVersion`.
//! - `idempotency_keys`: per-projection processed-key ledger (§3).

diesel::table! {
    event_log (aggregate_id, version) {
        aggregate_id -> Text,
        version -> BigInt,
        event_id -> Uuid,
        event_name -> Text,
        payload -> Jsonb,
        metadata -> Jsonb,
        idempotency_key -> Uuid,
        global_seq -> BigInt,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    outbox (outbox_id) {
        outbox_id -> Uuid,
        event_id -> Uuid,
        aggregate_id -> Text,
        event_name -> Text,
        payload -> Jsonb,
        correlation_id -> Uuid,
        causation_id -> Uuid,
        idempotency_key -> Uuid,
        status -> Text,
        retry_count -> Integer,
        last_error -> Nullable<Text>,
        created_at -> Timestamptz,
        next_attempt_at -> Timestamptz,
    }
}

diesel::table! {
    lag_entries (event_id) {
        event_id -> Uuid,
        event_name -> Text,
        aggregate_id -> Text,
        created_at -> Timestamptz,
        published_at -> Nullable<Timestamptz>,
        dispatch_duration_ms -> Nullable<BigInt>,
        processed_at -> Nullable<Timestamptz>,
        processing_duration_ms -> Nullable<BigInt>,
        total_lag_ms -> Nullable<BigInt>,
        status -> Text,
    }
}

diesel::table! {
    projection_checkpoints (projection_id) {
        projection_id -> Text,
        last_event_version -> BigInt,
        checkpointed_at -> Timestamptz,
        idempotency_key -> Uuid,
        status -> Text,
    }
}

diesel::table! {
    idempotency_keys (projection_id, idempotency_key) {
        projection_id -> Text,
        idempotency_key -> Text,
        processed_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    event_log,
    outbox,
    lag_entries,
    projection_checkpoints,
    idempotency_keys,
);
