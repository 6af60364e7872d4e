//! Dispatcher worker process (§6: "three independently runnable
//! processes"). Connects to the bus once at startup, then runs the outbox
//! dispatcher loop until Ctrl-C.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use waitqueue_app::CompositionRoot;
use waitqueue_dispatcher::{AmqpPublisher, OutboxDispatcher};

#[tokio::main]
async fn main() {
    env_logger::init();

    let root = CompositionRoot::from_env().expect("composition root: failed to connect to database");
    let publisher = AmqpPublisher::connect(&root.bus_config)
        .await
        .expect("dispatcher worker: failed to connect to bus");

    let dispatcher = OutboxDispatcher::new(
        root.outbox_store.clone(),
        Arc::new(publisher),
        root.lag_tracker.clone(),
        root.outbox_config.clone(),
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("dispatcher worker: shutdown signal received");
        shutdown.cancel();
    });

    dispatcher.run(cancel).await;
}
