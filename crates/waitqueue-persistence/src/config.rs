//! Loads connection configuration from the environment. Follows the
//! `DATABASE_URL` convention plus the optional pool-size and outbox/bus
//! knobs from §6.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

// Lazily load `.env` exactly once.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignore error if no .env file is present
});

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("EVENT_STORE_CONNECTION")
            .or_else(|_| env::var("DATABASE_URL"))
            .expect("EVENT_STORE_CONNECTION (or DATABASE_URL) not set");
        let min_connections = env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(16);
        Self {
            url,
            min_connections,
            max_connections,
        }
    }
}

/// Outbox dispatcher tuning, read from §6's `OUTBOX_*` environment
/// variables.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub polling_interval_seconds: u64,
    pub batch_size: usize,
    pub max_retry_attempts: u32,
    pub base_retry_delay_seconds: u64,
    pub max_retry_delay_seconds: u64,
}

impl OutboxConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        Self {
            polling_interval_seconds: env::var("OUTBOX_POLLING_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            batch_size: env::var("OUTBOX_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            max_retry_attempts: env::var("OUTBOX_MAX_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            base_retry_delay_seconds: env::var("OUTBOX_BASE_RETRY_DELAY_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            max_retry_delay_seconds: env::var("OUTBOX_MAX_RETRY_DELAY_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }
}

/// Bus (AMQP) connection settings, read from §6's `BUS_*` environment
/// variables.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub exchange: String,
    pub exchange_type: String,
}

impl BusConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        Self {
            host: env::var("BUS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("BUS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5672),
            user: env::var("BUS_USER").unwrap_or_else(|_| "guest".to_string()),
            password: env::var("BUS_PASSWORD").unwrap_or_else(|_| "guest".to_string()),
            vhost: env::var("BUS_VHOST").unwrap_or_else(|_| "/".to_string()),
            exchange: env::var("BUS_EXCHANGE").unwrap_or_else(|_| "waiting_room_events".to_string()),
            exchange_type: env::var("BUS_EXCHANGE_TYPE").unwrap_or_else(|_| "topic".to_string()),
        }
    }

    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.vhost
        )
    }
}

/// Forces early `.env` load from external applications if desired.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
