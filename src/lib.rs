//! Stocky Backend Library
//!
//! Reward ledger engine: issues stock rewards as balanced double-entry
//! postings, keeps a synthetic price catalogue fresh, and serves read-only
//! portfolio views over the ledger.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorKind};

use database::Database;
use policy::{RandomBandFee, ThreadRandom, UniformPriceBand};
use repositories::{RewardRepository, StockRepository};
use services::{PortfolioService, PriceOracle, RewardService};
use std::sync::Arc;
use store::{LedgerStore, PriceStore};

/// Application state containing the stores and services
pub struct AppState {
    /// Present when running against PostgreSQL
    pub database: Option<Database>,
    pub ledger: Arc<dyn LedgerStore>,
    pub prices: Arc<dyn PriceStore>,
    pub oracle: Arc<PriceOracle>,
    pub reward_service: Arc<RewardService>,
    pub portfolio_service: Arc<PortfolioService>,
}

impl AppState {
    /// Create a new AppState backed by PostgreSQL
    pub fn new(pool: sqlx::PgPool, config: &AppConfig) -> AppResult<Self> {
        let mut state = Self::with_stores(
            Arc::new(RewardRepository::new(pool.clone())),
            Arc::new(StockRepository::new(pool.clone())),
            config,
        )?;
        state.database = Some(Database::new(pool));
        Ok(state)
    }

    /// Create an AppState over arbitrary stores, wiring policies from config
    pub fn with_stores(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceStore>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let random = Arc::new(ThreadRandom);
        let price_policy = UniformPriceBand::new(config.oracle.band(), random.clone())?;
        let fee_policy = RandomBandFee::new(config.fee.band(), random)?;

        let oracle = Arc::new(
            PriceOracle::new(prices.clone(), Arc::new(price_policy))
                .with_update_interval(config.oracle.update_interval()),
        );
        let reward_service = RewardService::new(ledger.clone(), oracle.clone(), Arc::new(fee_policy))
            .with_timeout(config.request_timeout());
        let portfolio_service =
            PortfolioService::new(ledger.clone()).with_timeout(config.request_timeout());

        Ok(Self {
            database: None,
            ledger,
            prices,
            oracle,
            reward_service: Arc::new(reward_service),
            portfolio_service: Arc::new(portfolio_service),
        })
    }
}
