//! Read-side shapes derived from STOCK/DEBIT ledger lines

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One STOCK/DEBIT line joined with its CASH leg and the current price
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HoldingRow {
    pub stock_symbol: String,
    pub quantity: f64,
    /// Amount of the CASH/CREDIT line of the same reward
    pub cost_basis_inr: f64,
    pub current_price: f64,
    pub created_at: DateTime<Utc>,
}

/// Half-open `[from, to)` interval over ledger `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }
}

/// Which price an aggregation values past grants at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valuation {
    /// Revalue every grant at today's price
    #[default]
    CurrentPrice,
    /// Use the CASH amount recorded when the grant was issued
    IssuancePrice,
}

impl Valuation {
    pub fn value_of(&self, row: &HoldingRow) -> f64 {
        match self {
            Valuation::CurrentPrice => row.quantity * row.current_price,
            Valuation::IssuancePrice => row.cost_basis_inr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub total_value_inr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub shares: f64,
    pub stock_price: f64,
    pub total_value_inr: f64,
    pub cost_basis_inr: f64,
}

impl PortfolioPosition {
    /// Value change since issuance at the current price
    pub fn unrealized_gain_inr(&self) -> f64 {
        self.total_value_inr - self.cost_basis_inr
    }
}
