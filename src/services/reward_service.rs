use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{with_deadline, PriceOracle, DEFAULT_TIMEOUT};
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{LedgerEntry, RewardEvent, RewardPosting, RewardReceipt, RewardRequest};
use crate::policy::FeePolicy;
use crate::store::LedgerStore;

/// Issues stock rewards and writes their double-entry postings
pub struct RewardService {
    ledger: Arc<dyn LedgerStore>,
    oracle: Arc<PriceOracle>,
    fee_policy: Arc<dyn FeePolicy>,
    timeout: Duration,
}

impl RewardService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        oracle: Arc<PriceOracle>,
        fee_policy: Arc<dyn FeePolicy>,
    ) -> Self {
        Self {
            ledger,
            oracle,
            fee_policy,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the default deadline for `issue_reward`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issue a reward under the service's default deadline
    pub async fn issue_reward(&self, request: RewardRequest) -> AppResult<RewardReceipt> {
        self.issue_reward_with_deadline(request, self.timeout).await
    }

    /// Issue a reward under a caller-supplied deadline.
    ///
    /// If the deadline passes before the ledger transaction commits, nothing
    /// is written and the call fails with a retryable timeout.
    pub async fn issue_reward_with_deadline(
        &self,
        request: RewardRequest,
        deadline: Duration,
    ) -> AppResult<RewardReceipt> {
        with_deadline(deadline, "issue_reward", self.issue(request)).await
    }

    async fn issue(&self, request: RewardRequest) -> AppResult<RewardReceipt> {
        request.validate().map_err(AppError::Validation)?;

        info!(
            "Issuing reward: reward_id={}, user={}, symbol={}, shares={}",
            request.reward_id, request.user_id, request.stock_symbol, request.shares
        );

        // Price is read before the ledger transaction opens; the quote used is
        // the one recorded on the CASH line.
        let quote = self.oracle.get_price(&request.stock_symbol).await?;
        let now = Utc::now();
        if quote.is_stale(now, self.oracle.staleness_bound()) {
            warn!(
                "Price for {} is older than {:?} (as of {})",
                quote.symbol,
                self.oracle.staleness_bound(),
                quote.as_of
            );
        }

        if !self.ledger.user_exists(request.user_id).await? {
            return Err(AppError::Validation(format!(
                "user_id {} does not exist",
                request.user_id
            )));
        }

        let stock_value_inr = request.shares * quote.price;
        if !stock_value_inr.is_finite() {
            return Err(AppError::Validation(format!(
                "{} shares of {} at {:.2} is not a representable INR amount",
                request.shares, request.stock_symbol, quote.price
            )));
        }

        let fee = self.fee_policy.fee_for(&quote, request.shares);
        info!("Calculated price_per_share: {:.2}, fee: {:.2}", quote.price, fee);

        let posting = RewardPosting::build(&request, &quote, fee, now);
        posting
            .check_balanced()
            .map_err(|e| AppError::Message(format!("unbalanced reward posting: {}", e)))?;

        match self.ledger.record_reward(&posting).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate(_)) => {
                warn!("Duplicate reward_id rejected: {}", request.reward_id);
                return Err(AppError::DuplicateReward(request.reward_id));
            }
            Err(e) => {
                error!("Failed to record reward {}: {}", request.reward_id, e);
                return Err(e.into());
            }
        }

        info!(
            "Reward {} recorded for user {}: {} x {} @ {:.2}",
            posting.reward().id,
            request.user_id,
            request.shares,
            request.stock_symbol,
            quote.price
        );

        Ok(RewardReceipt {
            price_per_share: posting.price_per_share(),
            stock_value_inr: posting.stock_value_inr(),
            fee_inr: posting.fee_inr(),
            price_as_of: quote.as_of,
            reward: posting.reward().clone(),
        })
    }

    /// Look up a reward by its idempotency key
    pub async fn find_reward(&self, reward_id: &str) -> AppResult<Option<RewardEvent>> {
        Ok(self.ledger.find_reward_by_key(reward_id).await?)
    }

    /// Ledger lines written for a reward event
    pub async fn ledger_entries(&self, reward: Uuid) -> AppResult<Vec<LedgerEntry>> {
        Ok(self.ledger.entries_for_reward(reward).await?)
    }
}
