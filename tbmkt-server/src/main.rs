//! Token-Bound Marketplace Server
//!
//! Order lifecycle service for wallet-bound NFT positions: validates
//! and stores listings and bids, ingests chain events, and keeps order
//! staleness converged in the background.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tbmkt_core::events::chain_event_channel;
use tbmkt_core::ingest::ChainEventIngestor;
use tbmkt_core::marketplace::MarketplaceService;
use tbmkt_core::processors::{CancellationExpiry, StalenessAuditor};
use tbmkt_core::utils::minutes;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Token-Bound Marketplace - order lifecycle service
#[derive(Parser, Debug)]
#[command(name = "tbmkt-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tbmkt-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting tbmkt-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let service = Arc::new(MarketplaceService::new(db_pool.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (chain_events_tx, chain_events_rx) = chain_event_channel();

    // Background processors: chain event ingestion, the staleness
    // audit and the pending-cancellation expiry sweep.
    let ingestor = ChainEventIngestor::new(
        db_pool.clone(),
        service.clone(),
        chain_events_rx,
        shutdown_rx.clone(),
    );
    let ingestor_handle = tokio::spawn(ingestor.run());

    let auditor = StalenessAuditor::new(
        db_pool.clone(),
        service.clone(),
        config.marketplace.chains.clone(),
        Duration::from_secs(config.marketplace.audit_interval_secs),
        config.marketplace.audit_batch_size,
    );
    let auditor_handle = tokio::spawn(auditor.run(shutdown_rx.clone()));

    let expiry = CancellationExpiry::new(
        db_pool.clone(),
        service.clone(),
        Duration::from_secs(config.marketplace.expiry_interval_secs),
        minutes(config.marketplace.pending_cancellation_timeout_mins),
    );
    let expiry_handle = tokio::spawn(expiry.run(shutdown_rx));

    let state = AppState::new(service, chain_events_tx);
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_tx).await;

    // The watch channel has flipped; wait for the processors to drain.
    let _ = ingestor_handle.await;
    let _ = auditor_handle.await;
    let _ = expiry_handle.await;

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
