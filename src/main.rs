//! Stocky Backend Service
//!
//! Main entry point for the Stocky reward ledger. This process:
//! - applies the ledger schema migrations
//! - seeds the configured stock catalogue
//! - runs the background price updater until shutdown

use anyhow::Context;
use std::sync::Arc;
use stocky_backend::database::{create_pool, run_migrations};
use stocky_backend::services::PriceUpdater;
use stocky_backend::{AppConfig, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Configuration error")?;

    // Initialize tracing/logging with config
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("stocky_backend={},sqlx=warn", config.log_level).into()
    });
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Stocky backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Database migration failed")?;
    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    let app_state = AppState::new(pool.clone(), &config).context("Failed to build application state")?;
    if let Some(database) = &app_state.database {
        database
            .health_check()
            .await
            .context("Database health check failed")?;
        info!("✓ Database health check passed");
    }
    info!("✓ Application state initialized");

    let seeded = app_state
        .oracle
        .seed(&config.oracle.seed_symbols)
        .await
        .context("Failed to seed stock prices")?;
    info!(
        "✓ Stock catalogue ready ({} of {} symbols newly seeded)",
        seeded,
        config.oracle.seed_symbols.len()
    );

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let updater = PriceUpdater::new(Arc::clone(&app_state.oracle));
    let mut updater_handle = tokio::spawn(async move {
        updater.start().await;
    });
    info!(
        "✓ Price updater started ({:?} interval)",
        config.oracle.update_interval()
    );

    info!("Stocky backend ready. Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = &mut updater_handle => {
            error!("Price updater exited unexpectedly");
        }
    }

    updater_handle.abort();
    if let Some(database) = &app_state.database {
        database.close().await;
    }

    info!("Stocky backend shutdown complete");
    Ok(())
}
