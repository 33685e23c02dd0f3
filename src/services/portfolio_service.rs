//! Read-only aggregation views over the reward ledger.
//!
//! Each view checks that the user exists, then issues exactly one ledger read
//! (STOCK/DEBIT lines of one user, joined with current prices) and folds the
//! rows here, so a view either succeeds as a whole or fails as a whole.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{with_deadline, DEFAULT_TIMEOUT};
use crate::error::{AppError, AppResult};
use crate::models::{DailyValue, HoldingRow, PortfolioPosition, RewardEvent, TimeWindow, Valuation};
use crate::store::LedgerStore;

pub struct PortfolioService {
    ledger: Arc<dyn LedgerStore>,
    valuation: Valuation,
    /// `None` follows the server's local zone, resolved on every call
    utc_offset: Option<FixedOffset>,
    timeout: Duration,
}

impl PortfolioService {
    /// Create a service using the server's local time zone for day boundaries
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            valuation: Valuation::default(),
            utc_offset: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_valuation(mut self, valuation: Valuation) -> Self {
        self.valuation = valuation;
        self
    }

    /// Pin the offset that defines where calendar days start
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current calendar date in the configured offset
    pub fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.utc_offset)
    }

    /// Local midnight of `date` up to local midnight of the next date. Across
    /// a DST change the window is 23 or 25 hours long.
    fn day_window(&self, date: NaiveDate) -> AppResult<TimeWindow> {
        let next = date
            .succ_opt()
            .ok_or_else(|| AppError::Validation(format!("invalid date {}", date)))?;

        Ok(TimeWindow {
            from: start_of_day(date, self.utc_offset)?,
            to: start_of_day(next, self.utc_offset)?,
        })
    }

    async fn ensure_user(&self, user_id: i64) -> AppResult<()> {
        if self.ledger.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user {} not found", user_id)))
        }
    }

    /// Rewards granted to the user today
    pub async fn today_stocks(&self, user_id: i64) -> AppResult<Vec<RewardEvent>> {
        self.today_stocks_on(user_id, self.today()).await
    }

    /// Rewards granted to the user on `date`, oldest first
    pub async fn today_stocks_on(&self, user_id: i64, date: NaiveDate) -> AppResult<Vec<RewardEvent>> {
        let window = self.day_window(date)?;
        with_deadline(self.timeout, "today_stocks", async {
            self.ensure_user(user_id).await?;
            Ok(self.ledger.rewards_between(user_id, window).await?)
        })
        .await
    }

    /// Value of the user's grants per calendar date, ascending by date
    pub async fn historical_inr(&self, user_id: i64) -> AppResult<Vec<DailyValue>> {
        debug!("Fetching historical INR for user {}", user_id);
        let rows = self.holdings(user_id, None, "historical_inr").await?;
        Ok(value_by_date(&rows, self.valuation, self.utc_offset))
    }

    /// Value of today's grants per symbol
    pub async fn user_stats(&self, user_id: i64) -> AppResult<BTreeMap<String, f64>> {
        self.user_stats_on(user_id, self.today()).await
    }

    /// Value of the grants made on `date` per symbol
    pub async fn user_stats_on(&self, user_id: i64, date: NaiveDate) -> AppResult<BTreeMap<String, f64>> {
        let window = self.day_window(date)?;
        let rows = self.holdings(user_id, Some(window), "user_stats").await?;
        Ok(value_by_symbol(&rows, self.valuation))
    }

    /// All-time holdings per symbol at the current price
    pub async fn portfolio(&self, user_id: i64) -> AppResult<BTreeMap<String, PortfolioPosition>> {
        let rows = self.holdings(user_id, None, "portfolio").await?;
        Ok(positions(&rows))
    }

    async fn holdings(
        &self,
        user_id: i64,
        window: Option<TimeWindow>,
        operation: &str,
    ) -> AppResult<Vec<HoldingRow>> {
        with_deadline(self.timeout, operation, async {
            self.ensure_user(user_id).await?;
            Ok(self.ledger.stock_holdings(user_id, window).await?)
        })
        .await
    }
}

fn local_date(at: DateTime<Utc>, offset: Option<FixedOffset>) -> NaiveDate {
    match offset {
        Some(offset) => at.with_timezone(&offset).date_naive(),
        None => at.with_timezone(&Local).date_naive(),
    }
}

fn start_of_day(date: NaiveDate, offset: Option<FixedOffset>) -> AppResult<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Validation(format!("invalid date {}", date)))?;
    let start = match offset {
        Some(offset) => offset
            .from_local_datetime(&midnight)
            .single()
            .map(|t| t.with_timezone(&Utc)),
        // Earliest of the two on a fall-back night
        None => Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
    };
    start.ok_or_else(|| AppError::Validation(format!("no local midnight on {}", date)))
}

fn value_by_date(
    rows: &[HoldingRow],
    valuation: Valuation,
    offset: Option<FixedOffset>,
) -> Vec<DailyValue> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        let date = local_date(row.created_at, offset);
        *by_date.entry(date).or_insert(0.0) += valuation.value_of(row);
    }

    by_date
        .into_iter()
        .map(|(date, total_value_inr)| DailyValue { date, total_value_inr })
        .collect()
}

fn value_by_symbol(rows: &[HoldingRow], valuation: Valuation) -> BTreeMap<String, f64> {
    let mut by_symbol = BTreeMap::new();
    for row in rows {
        *by_symbol.entry(row.stock_symbol.clone()).or_insert(0.0) += valuation.value_of(row);
    }
    by_symbol
}

fn positions(rows: &[HoldingRow]) -> BTreeMap<String, PortfolioPosition> {
    let mut by_symbol: BTreeMap<String, PortfolioPosition> = BTreeMap::new();
    for row in rows {
        let position = by_symbol
            .entry(row.stock_symbol.clone())
            .or_insert(PortfolioPosition {
                shares: 0.0,
                stock_price: row.current_price,
                total_value_inr: 0.0,
                cost_basis_inr: 0.0,
            });
        position.shares += row.quantity;
        position.cost_basis_inr += row.cost_basis_inr;
    }

    for position in by_symbol.values_mut() {
        position.total_value_inr = position.shares * position.stock_price;
    }
    by_symbol
}
