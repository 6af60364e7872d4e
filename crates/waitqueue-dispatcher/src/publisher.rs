//! `EventPublisher`: outbox-mode no-op vs. bus-mode AMQP publish.
//!
//! The command-handling path never publishes directly — it only commits the
//! event and outbox rows (§4.2 invariant 3) — so it is wired with
//! `NoopPublisher`. The dispatcher worker is wired with `AmqpPublisher`,
//! which is the only place a message actually reaches the bus.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use log::{debug, info};
use waitqueue_core::OutboxEntry;
use waitqueue_persistence::BusConfig;

use crate::error::DispatchError;

/// Publishes a due outbox entry to a message bus (or nowhere, for outbox-only
/// deployments where the outbox itself is the durable record).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, entry: &OutboxEntry) -> Result<(), DispatchError>;
}

/// Used on the command-handling path: the event is already durably recorded
/// by the time `save` returns, so publishing is the dispatcher's job alone.
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, entry: &OutboxEntry) -> Result<(), DispatchError> {
        debug!("noop publish: event_id={} event_name={}", entry.event_id, entry.event_name);
        Ok(())
    }
}

/// Publishes to a RabbitMQ topic exchange. Routing key is the event name;
/// headers carry `correlationId`/`messageId`/`contentType` per §6's wire
/// format.
pub struct AmqpPublisher {
    channel: Channel,
    exchange: String,
}

impl AmqpPublisher {
    /// Connects to the bus and declares the configured exchange (idempotent:
    /// `declare` with matching arguments is a no-op if it already exists).
    pub async fn connect(config: &BusConfig) -> Result<Self, DispatchError> {
        let conn = Connection::connect(&config.amqp_uri(), ConnectionProperties::default())
            .await
            .map_err(|e| DispatchError::Bus(e.to_string()))?;
        let channel = conn.create_channel().await?;

        let kind = match config.exchange_type.as_str() {
            "topic" => ExchangeKind::Topic,
            "direct" => ExchangeKind::Direct,
            "fanout" => ExchangeKind::Fanout,
            other => return Err(DispatchError::Bus(format!("unsupported exchange type {other}"))),
        };
        channel
            .exchange_declare(
                &config.exchange,
                kind,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;

        info!("connected to bus exchange={} host={}", config.exchange, config.host);
        Ok(Self { channel, exchange: config.exchange.clone() })
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, entry: &OutboxEntry) -> Result<(), DispatchError> {
        let body = serde_json::to_vec(&entry.payload)
            .map_err(|e| DispatchError::Publish(e.to_string()))?;

        let mut headers = FieldTable::default();
        headers.insert(
            "correlationId".into(),
            AMQPValue::LongString(entry.correlation_id.to_string().into()),
        );
        headers.insert(
            "messageId".into(),
            AMQPValue::LongString(entry.idempotency_key.to_string().into()),
        );

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2) // persistent
            .with_headers(headers);

        self.channel
            .basic_publish(
                &self.exchange,
                &entry.event_name,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await?
            .await?;
        Ok(())
    }
}
