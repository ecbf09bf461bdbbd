//! `kiosk`: coin intake service for the self-service kiosk.
//!
//! ```sh
//! kiosk [CONFIG.json]
//! ```
//!
//! Opens the balance database, acquires the coin acceptor and runs the intake
//! loop until Ctrl-C. Frontend events are logged at debug level.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use kiosk_hardware::serial::SystemPortScanner;
use kiosk_hardware::{AnyPortScanner, ConnectionManager};
use kiosk_intake::{AuditLog, CoinIntake, DEFAULT_AUDIT_CAPACITY, EventBus, KioskEvent, Ledger};
use kiosk_storage::{Database, SqliteAuditLogRepository, SqliteBalanceRepository};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{CONFIG_ENV, KioskConfig, config_path};

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let config = KioskConfig::load(path.as_deref())?;

    init_tracing(&config.log_level);
    info!(
        version = kiosk_core::VERSION,
        config = ?path,
        "Starting coin kiosk"
    );

    let intake_config = config.intake_config()?;

    let db = Database::open(config.database_config())
        .await
        .context("failed to open database")?;
    let events = EventBus::default();
    let monitor = tokio::spawn(log_events(events.subscribe()));

    let ledger = Arc::new(
        Ledger::open(SqliteBalanceRepository::new(db.pool().clone()))
            .await
            .context("failed to load balance")?
            .with_events(events.clone()),
    );

    let (audit, writer) = AuditLog::channel(
        SqliteAuditLogRepository::new(db.pool().clone()),
        DEFAULT_AUDIT_CAPACITY,
    );
    let writer = tokio::spawn(writer.run());

    let manager = ConnectionManager::new(
        AnyPortScanner::System(SystemPortScanner::new()),
        config.connection_config(),
    );
    let (connection, transport) = manager.start();
    let status = connection.status();

    let intake = CoinIntake::new(intake_config, ledger.clone(), events, Arc::new(audit));
    let intake = tokio::spawn(intake.run(transport));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!(status = ?status.summary(), "Shutdown requested");

    // Releasing the port closes the transport, which ends the intake loop and
    // with it the last audit and event senders.
    if let Err(e) = connection.shutdown().await {
        warn!(error = %e, "Failed to release coin acceptor");
    }
    let stats = intake.await.context("intake task panicked")?;
    let written = writer.await.context("audit writer panicked")?;
    monitor.await.context("event monitor panicked")?;

    info!(
        balance = %ledger.balance().await,
        credited = stats.credited,
        rejected = stats.rejected,
        audit_entries = written,
        "Coin kiosk stopped"
    );
    db.close().await;

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn log_events(mut events: broadcast::Receiver<KioskEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => debug!(event = event.name(), %payload, "Event"),
                Err(e) => warn!(event = event.name(), error = %e, "Failed to encode event"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event monitor lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
