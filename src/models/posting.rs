//! The unit of work written to the ledger for one reward

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::ledger_entry::{Direction, EntryType, LedgerEntry};
use crate::models::reward::{RewardEvent, RewardRequest};
use crate::models::stock::PriceQuote;

/// Relative tolerance when comparing the CASH leg against shares × price
const VALUE_TOLERANCE: f64 = 1e-9;

/// A reward event plus its three ledger lines, written all-or-nothing.
///
/// Every line references the event id and is stamped with the event's
/// `rewarded_at`, so daily aggregation follows business time.
#[derive(Debug, Clone)]
pub struct RewardPosting {
    reward: RewardEvent,
    entries: [LedgerEntry; 3],
    price_per_share: f64,
}

impl RewardPosting {
    pub fn build(
        request: &RewardRequest,
        quote: &PriceQuote,
        fee_inr: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let reward = RewardEvent {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            stock_symbol: request.stock_symbol.clone(),
            shares: request.shares,
            reward_id: request.reward_id.clone(),
            rewarded_at: request.rewarded_at,
            created_at: now,
        };

        let at = request.rewarded_at;
        let stock_value_inr = request.shares * quote.price;
        let entries = [
            LedgerEntry::stock_debit(request.user_id, &request.stock_symbol, request.shares, reward.id, at),
            LedgerEntry::cash_credit(request.user_id, stock_value_inr, reward.id, at),
            LedgerEntry::fee_credit(request.user_id, fee_inr, reward.id, at),
        ];

        Self {
            reward,
            entries,
            price_per_share: quote.price,
        }
    }

    /// Assemble a posting from already-built rows without checking them.
    /// Stores still enforce their own constraints when it is written.
    pub fn from_parts(reward: RewardEvent, entries: [LedgerEntry; 3], price_per_share: f64) -> Self {
        Self {
            reward,
            entries,
            price_per_share,
        }
    }

    pub fn reward(&self) -> &RewardEvent {
        &self.reward
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn price_per_share(&self) -> f64 {
        self.price_per_share
    }

    fn amount_of(&self, entry_type: EntryType, direction: Direction) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.is(entry_type, direction))
            .map(|e| e.amount_inr)
            .sum()
    }

    pub fn stock_value_inr(&self) -> f64 {
        self.amount_of(EntryType::Cash, Direction::Credit)
    }

    pub fn fee_inr(&self) -> f64 {
        self.amount_of(EntryType::Fee, Direction::Credit)
    }

    /// Verify the double-entry shape: one STOCK/DEBIT, one CASH/CREDIT and one
    /// FEE/CREDIT line, all referencing the event at its business time, with
    /// CASH equal to quantity × price.
    pub fn check_balanced(&self) -> Result<(), String> {
        let expected = [
            (EntryType::Stock, Direction::Debit),
            (EntryType::Cash, Direction::Credit),
            (EntryType::Fee, Direction::Credit),
        ];
        for (entry_type, direction) in expected {
            let count = self
                .entries
                .iter()
                .filter(|e| e.is(entry_type, direction))
                .count();
            if count != 1 {
                return Err(format!(
                    "expected exactly one {}/{} line, found {}",
                    entry_type.as_str(),
                    direction.as_str(),
                    count
                ));
            }
        }

        for entry in &self.entries {
            if entry.reference_id != self.reward.id {
                return Err(format!(
                    "ledger line {} references {} instead of reward {}",
                    entry.id, entry.reference_id, self.reward.id
                ));
            }
            if entry.user_id != self.reward.user_id {
                return Err(format!("ledger line {} belongs to another user", entry.id));
            }
            if entry.created_at != self.reward.rewarded_at {
                return Err(format!("ledger line {} is not stamped with the reward time", entry.id));
            }
        }

        let stock = self
            .entries
            .iter()
            .find(|e| e.is(EntryType::Stock, Direction::Debit))
            .ok_or_else(|| "missing STOCK/DEBIT line".to_string())?;
        let quantity = stock.quantity.unwrap_or(0.0);
        if stock.stock_symbol.as_deref() != Some(self.reward.stock_symbol.as_str())
            || quantity != self.reward.shares
        {
            return Err("STOCK/DEBIT line does not match the reward".to_string());
        }

        let expected_value = quantity * self.price_per_share;
        let cash = self.stock_value_inr();
        if !expected_value.is_finite() || !cash.is_finite() {
            return Err(format!(
                "CASH/CREDIT amount is not finite ({} shares x {})",
                quantity, self.price_per_share
            ));
        }
        if (cash - expected_value).abs() > VALUE_TOLERANCE * expected_value.abs().max(1.0) {
            return Err(format!(
                "CASH/CREDIT {} does not equal {} shares x {}",
                cash, quantity, self.price_per_share
            ));
        }

        let fee = self.fee_inr();
        if !fee.is_finite() || fee < 0.0 {
            return Err(format!("fee must be a non-negative amount, got {}", fee));
        }

        Ok(())
    }
}
