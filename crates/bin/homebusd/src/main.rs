//! # homebusd, the homebus daemon
//!
//! Composition root that wires all adapters together and runs the bus.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Register configured actuators in the store
//! - Construct repository implementations (adapters)
//! - Connect to the broker and feed its messages to the telemetry router
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

use homebus_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqliteAlertRepository, SqliteDeviceRepository,
    SqliteReadingRepository,
};
use homebus_app::event_bus::InProcessEventBus;
use homebus_app::ports::DeviceRepository;
use homebus_app::router::TelemetryRouter;
use homebus_domain::event::Event;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DatabaseConfig {
        database_url: config.database_url().to_string(),
        max_connections: config.database.max_connections,
    }
    .build()
    .await
    .context("opening database")?;
    let pool = db.pool().clone();

    // Repositories
    let reading_repo = SqliteReadingRepository::new(pool.clone());
    let device_repo = Arc::new(SqliteDeviceRepository::new(pool.clone()));
    let alert_repo = SqliteAlertRepository::new(pool);

    for seed in &config.devices {
        let device = device_repo.upsert(seed.to_device()?).await?;
        tracing::info!(device_id = %device.id, class = %device.class, status = %device.status, "actuator registered");
    }

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(config.control.event_capacity));
    tokio::spawn(log_events(event_bus.subscribe()));

    // Broker
    let (connection, event_loop) = homebus_adapter_mqtt::connect(&config.broker);
    let (inbound_tx, inbound_rx) = mpsc::channel(config.broker.channel_capacity.max(1));
    let broker_task = tokio::spawn(event_loop.run(inbound_tx));

    let router = TelemetryRouter::new(
        reading_repo,
        device_repo,
        alert_repo,
        connection.clone(),
        event_bus,
        config.router_settings(),
    );

    tracing::info!(
        host = %config.broker.broker_host,
        port = config.broker.broker_port,
        namespace = %config.broker.base_topic,
        "homebusd started"
    );

    tokio::select! {
        () = router.run(inbound_rx) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("listening for shutdown signal")?;
            tracing::info!("shutdown requested");
            connection.shutdown();
        }
    }

    broker_task.await.context("joining broker task")?;
    tracing::info!("homebusd stopped");
    Ok(())
}

/// Trace every bus event until the bus is dropped.
async fn log_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(
                event_type = %event.event_type,
                subject = ?event.subject,
                data = %event.data,
                "bus event"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagging behind the bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
