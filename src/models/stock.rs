use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;

/// Current price of one symbol, owned by the price oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockPrice {
    pub stock_symbol: String,
    pub price: f64,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time price read handed to the reward engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub as_of: DateTime<Utc>,
}

impl PriceQuote {
    /// Whether the quote is older than `bound` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, bound: Duration) -> bool {
        match (now - self.as_of).to_std() {
            Ok(age) => age > bound,
            // as_of in the future relative to `now`
            Err(_) => false,
        }
    }
}

impl From<StockPrice> for PriceQuote {
    fn from(row: StockPrice) -> Self {
        Self {
            symbol: row.stock_symbol,
            price: row.price,
            as_of: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_staleness() {
        let now = Utc::now();
        let quote = PriceQuote {
            symbol: "AAPL".to_string(),
            price: 150.0,
            as_of: now - chrono::Duration::seconds(15),
        };

        assert!(quote.is_stale(now, Duration::from_secs(10)));
        assert!(!quote.is_stale(now, Duration::from_secs(20)));
        assert!(!quote.is_stale(now - chrono::Duration::seconds(30), Duration::from_secs(1)));
    }
}
