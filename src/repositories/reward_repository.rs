//! PostgreSQL ledger store for reward events and ledger entries

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{HoldingRow, LedgerEntry, RewardEvent, RewardPosting, TimeWindow};
use crate::store::LedgerStore;

pub struct RewardRepository {
    pool: PgPool,
}

impl RewardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count ledger entries referencing a reward
    pub async fn count_entries(&self, reference_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ledger_entries WHERE reference_id = $1",
        )
        .bind(reference_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl LedgerStore for RewardRepository {
    async fn user_exists(&self, user_id: i64) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn record_reward(&self, posting: &RewardPosting) -> Result<(), RepositoryError> {
        let reward = posting.reward();

        // Dropping `tx` on any early return rolls every write back
        let mut tx = self.pool.begin().await?;

        // Early exit; the unique constraint on reward_id is what actually
        // settles two concurrent submissions of the same key.
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM reward_events WHERE reward_id = $1")
                .bind(&reward.reward_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(existing_id) = existing {
            warn!("duplicate reward_id {} (reward {})", reward.reward_id, existing_id);
            return Err(RepositoryError::Duplicate(format!(
                "reward_id {} already recorded",
                reward.reward_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO reward_events
            (id, user_id, stock_symbol, shares, reward_id, rewarded_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reward.id)
        .bind(reward.user_id)
        .bind(&reward.stock_symbol)
        .bind(reward.shares)
        .bind(&reward.reward_id)
        .bind(reward.rewarded_at)
        .bind(reward.created_at)
        .execute(&mut *tx)
        .await?;

        for entry in posting.entries() {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries
                (id, user_id, entry_type, stock_symbol, quantity, amount_inr, direction, reference_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(&entry.entry_type)
            .bind(&entry.stock_symbol)
            .bind(entry.quantity)
            .bind(entry.amount_inr)
            .bind(&entry.direction)
            .bind(entry.reference_id)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("recorded reward {} with {} ledger entries", reward.id, posting.entries().len());

        Ok(())
    }

    async fn find_reward_by_key(&self, reward_id: &str) -> Result<Option<RewardEvent>, RepositoryError> {
        let reward = sqlx::query_as::<_, RewardEvent>(
            r#"
            SELECT id, user_id, stock_symbol, shares, reward_id, rewarded_at, created_at
            FROM reward_events
            WHERE reward_id = $1
            "#,
        )
        .bind(reward_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    async fn entries_for_reward(&self, reference_id: Uuid) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, user_id, entry_type, stock_symbol, quantity, amount_inr, direction, reference_id, created_at
            FROM ledger_entries
            WHERE reference_id = $1
            ORDER BY CASE entry_type WHEN 'STOCK' THEN 0 WHEN 'CASH' THEN 1 ELSE 2 END
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn rewards_between(
        &self,
        user_id: i64,
        window: TimeWindow,
    ) -> Result<Vec<RewardEvent>, RepositoryError> {
        let rewards = sqlx::query_as::<_, RewardEvent>(
            r#"
            SELECT id, user_id, stock_symbol, shares, reward_id, rewarded_at, created_at
            FROM reward_events
            WHERE user_id = $1
                AND rewarded_at >= $2
                AND rewarded_at < $3
            ORDER BY rewarded_at
            "#,
        )
        .bind(user_id)
        .bind(window.from)
        .bind(window.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }

    async fn stock_holdings(
        &self,
        user_id: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<HoldingRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, HoldingRow>(
            r#"
            SELECT
                l.stock_symbol AS stock_symbol,
                COALESCE(l.quantity, 0) AS quantity,
                COALESCE(c.amount_inr, 0) AS cost_basis_inr,
                sp.price AS current_price,
                l.created_at AS created_at
            FROM ledger_entries l
            JOIN stocks sp
                ON l.stock_symbol = sp.stock_symbol
            LEFT JOIN ledger_entries c
                ON c.reference_id = l.reference_id
                AND c.entry_type = 'CASH'
                AND c.direction = 'CREDIT'
            WHERE l.user_id = $1
                AND l.entry_type = 'STOCK'
                AND l.direction = 'DEBIT'
                AND ($2::timestamptz IS NULL OR l.created_at >= $2)
                AND ($3::timestamptz IS NULL OR l.created_at < $3)
            ORDER BY l.created_at
            "#,
        )
        .bind(user_id)
        .bind(window.map(|w| w.from))
        .bind(window.map(|w| w.to))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
