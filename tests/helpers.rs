#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use stocky_backend::models::*;
use stocky_backend::policy::{FixedFee, SeededRandom, UniformPriceBand};
use stocky_backend::repositories::*;
use stocky_backend::services::{PortfolioService, PriceOracle, RewardService};
use stocky_backend::store::InMemoryStore;

pub const TEST_FEE_INR: f64 = 20.0;

/// Services wired over a shared in-memory store
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub oracle: Arc<PriceOracle>,
    pub rewards: RewardService,
    pub portfolio: PortfolioService,
}

impl TestHarness {
    /// Users 1 and 2 exist; AAPL trades at 150 and TCS at 1800
    pub fn new() -> Self {
        Self::with_store(
            InMemoryStore::new()
                .with_users([1, 2])
                .with_price("AAPL", 150.0)
                .with_price("TCS", 1800.0),
        )
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        let policy = UniformPriceBand::new(1500.0..2000.0, Arc::new(SeededRandom::new(7)))
            .expect("valid price band");
        let oracle = Arc::new(PriceOracle::new(store.clone(), Arc::new(policy)));
        let rewards = RewardService::new(store.clone(), oracle.clone(), Arc::new(FixedFee(TEST_FEE_INR)));
        let portfolio = PortfolioService::new(store.clone()).with_utc_offset(utc());

        Self {
            store,
            oracle,
            rewards,
            portfolio,
        }
    }

    /// Issue a reward that is expected to succeed
    pub async fn grant(&self, user_id: i64, symbol: &str, shares: f64, key: &str, at: DateTime<Utc>) -> RewardReceipt {
        self.rewards
            .issue_reward(RewardRequest::new(user_id, symbol, shares, key, at))
            .await
            .expect("reward should be issued")
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset")
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// UTC instant on the given day
pub fn at(y: i32, m: u32, d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).single().expect("valid instant")
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {} to be close to {}",
        actual,
        expected
    );
}

/// Test database configuration
pub struct TestDatabase {
    pub pool: PgPool,
    pub user_repo: Arc<UserRepository>,
    pub reward_repo: Arc<RewardRepository>,
    pub stock_repo: Arc<StockRepository>,
}

impl TestDatabase {
    /// Create TestDatabase from an existing pool (useful with sqlx::test)
    pub async fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: pool.clone(),
            user_repo: Arc::new(UserRepository::new(pool.clone())),
            reward_repo: Arc::new(RewardRepository::new(pool.clone())),
            stock_repo: Arc::new(StockRepository::new(pool)),
        }
    }

    /// Clean up all test data
    pub async fn cleanup(&self) {
        sqlx::query("TRUNCATE TABLE ledger_entries, reward_events, stocks, users RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .expect("Failed to cleanup test data");
    }
}
