//! Storage contracts for the reward ledger.
//!
//! Services receive these as `Arc<dyn ...>` so PostgreSQL and the in-memory
//! store are interchangeable. Implementations must provide:
//!
//! - atomic `record_reward`: the event and all of its ledger lines are
//!   written together or not at all
//! - uniqueness of `reward_id`, reported as [`RepositoryError::Duplicate`]
//! - single-query reads, so a view never observes half of a posting

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{HoldingRow, LedgerEntry, RewardEvent, RewardPosting, StockPrice, TimeWindow};

pub use memory::InMemoryStore;

/// Durable record of reward events and their ledger lines
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn user_exists(&self, user_id: i64) -> Result<bool, RepositoryError>;

    /// Write the reward event and its ledger lines in one transaction.
    async fn record_reward(&self, posting: &RewardPosting) -> Result<(), RepositoryError>;

    async fn find_reward_by_key(&self, reward_id: &str) -> Result<Option<RewardEvent>, RepositoryError>;

    async fn entries_for_reward(&self, reference_id: Uuid) -> Result<Vec<LedgerEntry>, RepositoryError>;

    /// Rewards of a user whose `rewarded_at` falls inside `window`, oldest first.
    async fn rewards_between(
        &self,
        user_id: i64,
        window: TimeWindow,
    ) -> Result<Vec<RewardEvent>, RepositoryError>;

    /// STOCK/DEBIT lines of a user joined with current price and cost basis,
    /// oldest first. Lines whose symbol has no price row are skipped.
    async fn stock_holdings(
        &self,
        user_id: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<HoldingRow>, RepositoryError>;
}

/// Current per-symbol prices, written only by the price oracle
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<Option<StockPrice>, RepositoryError>;

    /// All prices ordered by symbol
    async fn list_prices(&self) -> Result<Vec<StockPrice>, RepositoryError>;

    /// Insert a price if the symbol has none yet. Returns whether a row was inserted.
    async fn seed_price(&self, symbol: &str, price: f64) -> Result<bool, RepositoryError>;

    /// Overwrite prices of existing symbols in one transaction. Unknown symbols
    /// are ignored. Returns the number of rows updated.
    async fn update_prices(&self, prices: &[(String, f64)]) -> Result<u64, RepositoryError>;
}
