use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::RepositoryError;
use crate::models::StockPrice;
use crate::store::PriceStore;

/// Repository for the `stocks` price table
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    /// Create a new StockRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for StockRepository {
    async fn get_price(&self, symbol: &str) -> Result<Option<StockPrice>, RepositoryError> {
        let price = sqlx::query_as::<_, StockPrice>(
            "SELECT stock_symbol, price, updated_at FROM stocks WHERE stock_symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price)
    }

    async fn list_prices(&self) -> Result<Vec<StockPrice>, RepositoryError> {
        let prices = sqlx::query_as::<_, StockPrice>(
            "SELECT stock_symbol, price, updated_at FROM stocks ORDER BY stock_symbol",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(prices)
    }

    async fn seed_price(&self, symbol: &str, price: f64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO stocks (stock_symbol, price)
            VALUES ($1, $2)
            ON CONFLICT (stock_symbol) DO NOTHING
            "#,
        )
        .bind(symbol)
        .bind(price)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_prices(&self, prices: &[(String, f64)]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for (symbol, price) in prices {
            let result = sqlx::query(
                "UPDATE stocks SET price = $2, updated_at = NOW() WHERE stock_symbol = $1",
            )
            .bind(symbol)
            .bind(*price)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;

        Ok(updated)
    }
}
