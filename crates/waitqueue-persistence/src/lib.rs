//! waitqueue-persistence
//!
//! Postgres (Diesel) implementations of `waitqueue-core`'s storage traits:
//! the append-only event log, the transactional outbox, per-event lag
//! tracking, and projection checkpoints/idempotency ledger.
//!
//! Modules:
//! - `pg`: Diesel/r2d2-backed implementations.
//! - `migrations`: embedded Diesel migration runner.
//! - `config`: environment-driven `DbConfig`/`OutboxConfig`/`BusConfig`.
//! - `schema`: hand-maintained Diesel table declarations.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, BusConfig, DbConfig, OutboxConfig};
pub use error::PersistenceError;
pub use pg::{
    build_dev_pool_from_env, build_pool, ConnectionProvider, LagStatistics, PgCheckpointStore,
    PgEventStore, PgLagTracker, PgOutboxStore, PgPool, PoolProvider,
};
