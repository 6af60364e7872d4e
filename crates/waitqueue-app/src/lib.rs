//! waitqueue-app: the composition root and the three binaries built on top
//! of it (`command_service`, `dispatcher_worker`, `projection_worker`).
//!
//! Per §9's "explicit composition root ... no module-level mutable
//! singletons", all concrete infrastructure types are constructed once here
//! and handed to whichever binary needs them, rather than reached for via
//! lazily-initialized globals.

pub mod correlation;

use std::sync::Arc;

use waitqueue_persistence::{
    build_dev_pool_from_env, BusConfig, OutboxConfig, PersistenceError, PgCheckpointStore,
    PgEventStore, PgLagTracker, PgOutboxStore, PgPool, PoolProvider,
};

pub struct CompositionRoot {
    pub pool: PgPool,
    pub event_store: Arc<PgEventStore<PoolProvider, waitqueue_domain::WaitingQueueEventKind>>,
    pub outbox_store: Arc<PgOutboxStore<PoolProvider>>,
    pub checkpoint_store: Arc<PgCheckpointStore<PoolProvider>>,
    pub lag_tracker: Arc<PgLagTracker<PoolProvider>>,
    pub outbox_config: OutboxConfig,
    pub bus_config: BusConfig,
}

impl CompositionRoot {
    /// Builds one connection pool from the environment (running pending
    /// migrations against it), then wires every store on top of its own
    /// `PoolProvider` clone — `r2d2::Pool` is cheap to clone, so each store
    /// shares the same underlying pool.
    pub fn from_env() -> Result<Self, PersistenceError> {
        let pool = build_dev_pool_from_env()?;
        let outbox_config = OutboxConfig::from_env();
        let bus_config = BusConfig::from_env();

        Ok(Self {
            event_store: Arc::new(PgEventStore::new(PoolProvider { pool: pool.clone() })),
            outbox_store: Arc::new(PgOutboxStore::new(PoolProvider { pool: pool.clone() })),
            checkpoint_store: Arc::new(PgCheckpointStore::new(PoolProvider { pool: pool.clone() })),
            lag_tracker: Arc::new(PgLagTracker::new(PoolProvider { pool: pool.clone() })),
            pool,
            outbox_config,
            bus_config,
        })
    }
}
