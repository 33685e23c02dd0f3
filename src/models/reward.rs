use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One grant of shares to a user, keyed externally by `reward_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RewardEvent {
    pub id: Uuid,
    pub user_id: i64,
    pub stock_symbol: String,
    pub shares: f64,
    /// Caller-supplied idempotency key, unique across all rewards
    pub reward_id: String,
    /// Business event time supplied by the caller
    pub rewarded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input to reward issuance, as handed over by the request layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRequest {
    pub user_id: i64,
    pub stock_symbol: String,
    pub shares: f64,
    pub reward_id: String,
    pub rewarded_at: DateTime<Utc>,
}

impl RewardRequest {
    pub fn new(
        user_id: i64,
        stock_symbol: impl Into<String>,
        shares: f64,
        reward_id: impl Into<String>,
        rewarded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            stock_symbol: stock_symbol.into().trim().to_string(),
            shares,
            reward_id: reward_id.into().trim().to_string(),
            rewarded_at,
        }
    }

    /// Validate request fields that can be checked without touching storage
    pub fn validate(&self) -> Result<(), String> {
        if !self.shares.is_finite() || self.shares <= 0.0 {
            return Err(format!("shares must be a positive number, got {}", self.shares));
        }
        if self.stock_symbol.trim().is_empty() {
            return Err("stock_symbol must not be empty".to_string());
        }
        if self.reward_id.trim().is_empty() {
            return Err("reward_id must not be empty".to_string());
        }
        if self.user_id <= 0 {
            return Err(format!("user_id must be positive, got {}", self.user_id));
        }
        Ok(())
    }
}

/// Confirmation returned after a reward and its ledger entries are committed
#[derive(Debug, Clone, Serialize)]
pub struct RewardReceipt {
    pub reward: RewardEvent,
    pub price_per_share: f64,
    pub stock_value_inr: f64,
    pub fee_inr: f64,
    /// Update time of the price row the quote was read from
    pub price_as_of: DateTime<Utc>,
}

/// Parse an RFC 3339 reward timestamp such as `2024-12-18T10:00:00Z`
pub fn parse_rewarded_at(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Validation(format!("invalid timestamp format '{}': {}", raw, e)))
}
