//! Domain models for the Stocky backend.
//!
//! This module contains the database-backed rows of the reward ledger and
//! the read-side shapes derived from them.

pub mod ledger_entry;
pub mod posting;
pub mod reward;
pub mod stock;
pub mod user;
pub mod views;

// Re-export all models for convenient access
pub use ledger_entry::{Direction, EntryType, LedgerEntry};
pub use posting::RewardPosting;
pub use reward::{parse_rewarded_at, RewardEvent, RewardReceipt, RewardRequest};
pub use stock::{PriceQuote, StockPrice};
pub use user::User;
pub use views::{DailyValue, HoldingRow, PortfolioPosition, TimeWindow, Valuation};
