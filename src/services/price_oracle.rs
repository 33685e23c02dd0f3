//! Synthetic price oracle and its periodic updater.
//!
//! Prices have exactly one writer (the updater, plus initial seeding) and
//! many readers. Readers are not synchronized with the writer: a read racing
//! an update may observe either side of it, so the only freshness promise is
//! the staleness bound of one update interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::models::{PriceQuote, StockPrice};
use crate::policy::PricePolicy;
use crate::store::PriceStore;

pub struct PriceOracle {
    store: Arc<dyn PriceStore>,
    policy: Arc<dyn PricePolicy>,
    update_interval: Duration,
}

impl PriceOracle {
    pub fn new(store: Arc<dyn PriceStore>, policy: Arc<dyn PricePolicy>) -> Self {
        Self {
            store,
            policy,
            update_interval: Duration::from_secs(10), // Default: 10 seconds
        }
    }

    /// Set the updater interval
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Maximum age of a price a reader can observe
    pub fn staleness_bound(&self) -> Duration {
        self.update_interval
    }

    /// Current price of `symbol`
    pub async fn get_price(&self, symbol: &str) -> AppResult<PriceQuote> {
        let row = self
            .store
            .get_price(symbol)
            .await?
            .ok_or_else(|| AppError::StockNotFound(symbol.to_string()))?;

        Ok(row.into())
    }

    pub async fn list_prices(&self) -> AppResult<Vec<StockPrice>> {
        Ok(self.store.list_prices().await?)
    }

    /// Give every symbol without a price an initial draw from the policy.
    /// Returns how many symbols were newly priced.
    pub async fn seed(&self, symbols: &[String]) -> AppResult<usize> {
        let mut inserted = 0;
        for symbol in symbols {
            let price = self.policy.next_price(symbol, None);
            if self.store.seed_price(symbol, price).await? {
                info!("Seeded {} at {:.2}", symbol, price);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// One updater tick: resample every symbol and write the batch atomically
    pub async fn refresh_prices(&self) -> AppResult<u64> {
        let current = self.store.list_prices().await?;
        if current.is_empty() {
            return Ok(0);
        }

        let next: Vec<(String, f64)> = current
            .iter()
            .map(|row| {
                let price = self.policy.next_price(&row.stock_symbol, Some(row.price));
                (row.stock_symbol.clone(), price)
            })
            .collect();

        let updated = self.store.update_prices(&next).await?;
        debug!("Stock prices updated: {} symbols", updated);
        Ok(updated)
    }
}

/// Background task that resamples prices every interval
pub struct PriceUpdater {
    oracle: Arc<PriceOracle>,
    interval: Duration,
}

impl PriceUpdater {
    /// Create an updater ticking at the oracle's staleness bound
    pub fn new(oracle: Arc<PriceOracle>) -> Self {
        let interval = oracle.staleness_bound();
        Self { oracle, interval }
    }

    /// Start the updater loop. Runs until the task is aborted; a failed tick
    /// is logged and the next tick proceeds normally.
    pub async fn start(self) {
        // First tick completes immediately so seeded prices are refreshed at startup
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Price updater started, updating every {:?}", self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.oracle.refresh_prices().await {
                error!("Failed to update stock prices: {}", e);
            }
        }
    }
}
