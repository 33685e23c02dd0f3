//! In-process store implementing both storage contracts.
//!
//! Mirrors the PostgreSQL schema constraints (unique `reward_id`, foreign
//! keys to users, stocks and reward events, entry shape checks) so services
//! behave the same against either backend. Every write validates the whole
//! posting before mutating anything under a single lock.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use super::{LedgerStore, PriceStore};
use crate::error::RepositoryError;
use crate::models::{
    Direction, EntryType, HoldingRow, LedgerEntry, RewardEvent, RewardPosting, StockPrice,
    TimeWindow,
};

#[derive(Default)]
struct State {
    users: HashSet<i64>,
    rewards: Vec<RewardEvent>,
    reward_keys: HashMap<String, Uuid>,
    entries: Vec<LedgerEntry>,
    prices: BTreeMap<String, StockPrice>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
    write_latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(self, user_ids: impl IntoIterator<Item = i64>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.users.extend(user_ids);
        }
        self
    }

    pub fn with_price(self, symbol: &str, price: f64) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.prices.insert(
                symbol.to_string(),
                StockPrice {
                    stock_symbol: symbol.to_string(),
                    price,
                    updated_at: Utc::now(),
                },
            );
        }
        self
    }

    /// Delay applied before a reward write takes the lock. The write can
    /// still be abandoned during the delay, like an uncommitted transaction.
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    /// Simulate an unreachable backend; every call fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn add_user(&self, user_id: i64) -> Result<(), RepositoryError> {
        self.state()?.users.insert(user_id);
        Ok(())
    }

    pub fn reward_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.state()?.rewards.len())
    }

    pub fn entry_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.state()?.entries.len())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory store is offline".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

fn check_entry(entry: &LedgerEntry, reward: &RewardEvent) -> Result<(), RepositoryError> {
    let kind = entry.kind().ok_or_else(|| {
        RepositoryError::ConstraintViolation(format!("invalid entry_type {}", entry.entry_type))
    })?;
    if entry.side().is_none() {
        return Err(RepositoryError::ConstraintViolation(format!(
            "invalid direction {}",
            entry.direction
        )));
    }
    if entry.reference_id != reward.id {
        return Err(RepositoryError::ConstraintViolation(format!(
            "ledger entry {} references unknown reward {}",
            entry.id, entry.reference_id
        )));
    }
    let has_stock_fields = entry.stock_symbol.is_some() && entry.quantity.is_some();
    let has_no_stock_fields = entry.stock_symbol.is_none() && entry.quantity.is_none();
    let shape_ok = match kind {
        EntryType::Stock => has_stock_fields,
        EntryType::Cash | EntryType::Fee => has_no_stock_fields,
    };
    if !shape_ok {
        return Err(RepositoryError::ConstraintViolation(format!(
            "ledger entry {} has stock fields inconsistent with {}",
            entry.id, entry.entry_type
        )));
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn user_exists(&self, user_id: i64) -> Result<bool, RepositoryError> {
        Ok(self.state()?.users.contains(&user_id))
    }

    async fn record_reward(&self, posting: &RewardPosting) -> Result<(), RepositoryError> {
        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state()?;
        let reward = posting.reward();

        if state.reward_keys.contains_key(&reward.reward_id) {
            return Err(RepositoryError::Duplicate(format!(
                "reward_id {} already recorded",
                reward.reward_id
            )));
        }
        if !state.users.contains(&reward.user_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "user {} does not exist",
                reward.user_id
            )));
        }
        if !state.prices.contains_key(&reward.stock_symbol) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "stock {} does not exist",
                reward.stock_symbol
            )));
        }
        if reward.shares.is_nan() || reward.shares <= 0.0 {
            return Err(RepositoryError::ConstraintViolation(format!(
                "shares must be positive, got {}",
                reward.shares
            )));
        }
        for entry in posting.entries() {
            check_entry(entry, reward)?;
        }

        state.reward_keys.insert(reward.reward_id.clone(), reward.id);
        state.rewards.push(reward.clone());
        state.entries.extend(posting.entries().iter().cloned());
        Ok(())
    }

    async fn find_reward_by_key(&self, reward_id: &str) -> Result<Option<RewardEvent>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .rewards
            .iter()
            .find(|r| r.reward_id == reward_id)
            .cloned())
    }

    async fn entries_for_reward(&self, reference_id: Uuid) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.reference_id == reference_id)
            .cloned()
            .collect())
    }

    async fn rewards_between(
        &self,
        user_id: i64,
        window: TimeWindow,
    ) -> Result<Vec<RewardEvent>, RepositoryError> {
        let state = self.state()?;
        let mut rewards: Vec<RewardEvent> = state
            .rewards
            .iter()
            .filter(|r| r.user_id == user_id && window.contains(r.rewarded_at))
            .cloned()
            .collect();
        rewards.sort_by_key(|r| r.rewarded_at);
        Ok(rewards)
    }

    async fn stock_holdings(
        &self,
        user_id: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<HoldingRow>, RepositoryError> {
        let state = self.state()?;

        let cost_basis: HashMap<Uuid, f64> = state
            .entries
            .iter()
            .filter(|e| e.is(EntryType::Cash, Direction::Credit))
            .map(|e| (e.reference_id, e.amount_inr))
            .collect();

        let mut rows: Vec<HoldingRow> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.is(EntryType::Stock, Direction::Debit))
            .filter(|e| window.map_or(true, |w| w.contains(e.created_at)))
            .filter_map(|e| {
                let symbol = e.stock_symbol.as_ref()?;
                let price = state.prices.get(symbol)?;
                Some(HoldingRow {
                    stock_symbol: symbol.clone(),
                    quantity: e.quantity.unwrap_or(0.0),
                    cost_basis_inr: cost_basis.get(&e.reference_id).copied().unwrap_or(0.0),
                    current_price: price.price,
                    created_at: e.created_at,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn get_price(&self, symbol: &str) -> Result<Option<StockPrice>, RepositoryError> {
        Ok(self.state()?.prices.get(symbol).cloned())
    }

    async fn list_prices(&self) -> Result<Vec<StockPrice>, RepositoryError> {
        Ok(self.state()?.prices.values().cloned().collect())
    }

    async fn seed_price(&self, symbol: &str, price: f64) -> Result<bool, RepositoryError> {
        if price.is_nan() || price <= 0.0 {
            return Err(RepositoryError::ConstraintViolation(format!(
                "price must be positive, got {}",
                price
            )));
        }
        let mut state = self.state()?;
        if state.prices.contains_key(symbol) {
            return Ok(false);
        }
        state.prices.insert(
            symbol.to_string(),
            StockPrice {
                stock_symbol: symbol.to_string(),
                price,
                updated_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn update_prices(&self, prices: &[(String, f64)]) -> Result<u64, RepositoryError> {
        if let Some((symbol, price)) = prices.iter().find(|(_, p)| p.is_nan() || *p <= 0.0) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "price for {} must be positive, got {}",
                symbol, price
            )));
        }

        let mut state = self.state()?;
        let now = Utc::now();
        let mut updated = 0;
        for (symbol, price) in prices {
            if let Some(row) = state.prices.get_mut(symbol) {
                row.price = *price;
                row.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceQuote, RewardRequest};

    fn posting(key: &str, user_id: i64) -> RewardPosting {
        let request = RewardRequest::new(user_id, "AAPL", 10.0, key, Utc::now());
        let quote = PriceQuote {
            symbol: "AAPL".to_string(),
            price: 150.0,
            as_of: Utc::now(),
        };
        RewardPosting::build(&request, &quote, 20.0, Utc::now())
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new().with_users([1]).with_price("AAPL", 150.0)
    }

    #[tokio::test]
    async fn test_non_positive_prices_are_rejected() {
        let store = store();

        for bad in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                store.seed_price("TCS", bad).await,
                Err(RepositoryError::ConstraintViolation(_))
            ));
            assert!(matches!(
                store.update_prices(&[("AAPL".to_string(), bad)]).await,
                Err(RepositoryError::ConstraintViolation(_))
            ));
        }
        assert!(store.get_price("TCS").await.unwrap().is_none());
        assert_eq!(store.get_price("AAPL").await.unwrap().unwrap().price, 150.0);
    }

    #[tokio::test]
    async fn test_record_reward_enforces_unique_key() {
        let store = store();
        store.record_reward(&posting("r1", 1)).await.unwrap();

        let err = store.record_reward(&posting("r1", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
        assert_eq!(store.reward_count().unwrap(), 1);
        assert_eq!(store.entry_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_record_reward_rejects_unknown_user_without_writing() {
        let store = store();
        let err = store.record_reward(&posting("r1", 42)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
        assert_eq!(store.reward_count().unwrap(), 0);
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dangling_entry_aborts_whole_posting() {
        let store = store();
        let good = posting("r1", 1);
        let mut entries = [
            good.entries()[0].clone(),
            good.entries()[1].clone(),
            good.entries()[2].clone(),
        ];
        entries[2].reference_id = Uuid::new_v4();
        let broken = RewardPosting::from_parts(good.reward().clone(), entries, 150.0);

        assert!(store.record_reward(&broken).await.is_err());
        assert_eq!(store.reward_count().unwrap(), 0);
        assert_eq!(store.entry_count().unwrap(), 0);
        assert!(store.find_reward_by_key("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = store();
        store.set_offline(true);

        assert!(matches!(
            store.get_price("AAPL").await,
            Err(RepositoryError::Unavailable(_))
        ));
        assert!(store.stock_holdings(1, None).await.is_err());

        store.set_offline(false);
        assert!(store.get_price("AAPL").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seed_price_keeps_existing_row() {
        let store = store();
        assert!(!store.seed_price("AAPL", 999.0).await.unwrap());
        assert!(store.seed_price("TCS", 1700.0).await.unwrap());

        assert_eq!(store.get_price("AAPL").await.unwrap().unwrap().price, 150.0);
        let symbols: Vec<String> = store
            .list_prices()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.stock_symbol)
            .collect();
        assert_eq!(symbols, vec!["AAPL".to_string(), "TCS".to_string()]);
    }

    #[tokio::test]
    async fn test_update_prices_skips_unknown_symbols() {
        let store = store();
        let updated = store
            .update_prices(&[("AAPL".to_string(), 1600.0), ("ZZZZ".to_string(), 1700.0)])
            .await
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(store.get_price("AAPL").await.unwrap().unwrap().price, 1600.0);
        assert!(store.get_price("ZZZZ").await.unwrap().is_none());
    }
}
