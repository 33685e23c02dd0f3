pub mod portfolio_service;
pub mod price_oracle;
pub mod reward_service;

pub use portfolio_service::PortfolioService;
pub use price_oracle::{PriceOracle, PriceUpdater};
pub use reward_service::RewardService;

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default deadline for ledger writes and reads
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `operation` under `deadline`. On expiry the future is dropped, which
/// rolls back any transaction it had not yet committed.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} did not finish within {:?}",
            operation, deadline
        ))),
    }
}
