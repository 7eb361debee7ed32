//! TicketGate Server: group ticket issuance and gate redemption.
//!
//! Wires configuration, logging, the PostgreSQL store, and the issuance
//! backfill worker, then runs until SIGINT/SIGTERM.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use ticketgate_core::config::AppConfig;
use ticketgate_core::error::AppError;
use ticketgate_core::traits::{Clock, ScanPayloadEncoder, SystemClock};
use ticketgate_database::store::{PurchaseSource, TicketStore};
use ticketgate_database::{DatabasePool, PgPurchaseSource, PgTicketStore};
use ticketgate_service::{InlinePayloadEncoder, IssuanceBackfill, TicketIssuer};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error_kind = %e.kind, "Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load `config/default.toml`, the `TICKETGATE_ENV` overlay, and environment overrides
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("TICKETGATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TicketGate v{}", env!("CARGO_PKG_VERSION"));

    let db = DatabasePool::connect(&config.database).await?;
    ticketgate_database::migration::run_migrations(db.pool()).await?;

    let store: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(db.pool().clone()));
    let purchases: Arc<dyn PurchaseSource> = Arc::new(PgPurchaseSource::new(db.pool().clone()));
    let encoder: Arc<dyn ScanPayloadEncoder> = Arc::new(InlinePayloadEncoder::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let issuer = Arc::new(TicketIssuer::new(
        store,
        Arc::clone(&purchases),
        encoder,
        clock,
        config.issuance.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.worker.enabled {
        let backfill = IssuanceBackfill::new(issuer, purchases, config.worker.clone());
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move { backfill.run(cancel).await }))
    } else {
        tracing::info!("Issuance backfill disabled");
        None
    };

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Issuance backfill task panicked");
        }
    }

    db.close().await;
    tracing::info!("TicketGate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
