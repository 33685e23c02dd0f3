//! Double-entry ledger lines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of value a ledger line records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Stock,
    Cash,
    Fee,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "STOCK",
            Self::Cash => "CASH",
            Self::Fee => "FEE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STOCK" => Some(Self::Stock),
            "CASH" => Some(Self::Cash),
            "FEE" => Some(Self::Fee),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DEBIT" => Some(Self::Debit),
            "CREDIT" => Some(Self::Credit),
            _ => None,
        }
    }
}

/// One append-only bookkeeping line tied to a reward event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: i64,
    pub entry_type: String,
    /// Present only on STOCK lines
    pub stock_symbol: Option<String>,
    /// Present only on STOCK lines
    pub quantity: Option<f64>,
    pub amount_inr: f64,
    pub direction: String,
    /// Id of the originating reward event
    pub reference_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn line(
        user_id: i64,
        entry_type: EntryType,
        direction: Direction,
        amount_inr: f64,
        reference_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            entry_type: entry_type.as_str().to_string(),
            stock_symbol: None,
            quantity: None,
            amount_inr,
            direction: direction.as_str().to_string(),
            reference_id,
            created_at,
        }
    }

    /// Shares granted. The monetary value is carried by the matching CASH line.
    pub fn stock_debit(
        user_id: i64,
        stock_symbol: &str,
        quantity: f64,
        reference_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            stock_symbol: Some(stock_symbol.to_string()),
            quantity: Some(quantity),
            ..Self::line(user_id, EntryType::Stock, Direction::Debit, 0.0, reference_id, created_at)
        }
    }

    /// Cost basis credited at issuance price
    pub fn cash_credit(
        user_id: i64,
        amount_inr: f64,
        reference_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::line(user_id, EntryType::Cash, Direction::Credit, amount_inr, reference_id, created_at)
    }

    pub fn fee_credit(
        user_id: i64,
        amount_inr: f64,
        reference_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::line(user_id, EntryType::Fee, Direction::Credit, amount_inr, reference_id, created_at)
    }

    pub fn kind(&self) -> Option<EntryType> {
        EntryType::from_str(&self.entry_type)
    }

    pub fn side(&self) -> Option<Direction> {
        Direction::from_str(&self.direction)
    }

    pub fn is(&self, entry_type: EntryType, direction: Direction) -> bool {
        self.kind() == Some(entry_type) && self.side() == Some(direction)
    }
}
