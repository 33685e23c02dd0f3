use std::ops::Range;
use std::sync::Arc;

use super::{check_band, RandomSource};
use crate::error::AppResult;
use crate::models::PriceQuote;

/// Decides the transaction fee charged on a reward
pub trait FeePolicy: Send + Sync {
    fn fee_for(&self, quote: &PriceQuote, shares: f64) -> f64;
}

/// Fresh uniform draw per reward, independent of shares and price
pub struct RandomBandFee {
    band: Range<f64>,
    source: Arc<dyn RandomSource>,
}

impl RandomBandFee {
    pub fn new(band: Range<f64>, source: Arc<dyn RandomSource>) -> AppResult<Self> {
        check_band("fee", &band, false)?;
        Ok(Self { band, source })
    }

    pub fn band(&self) -> Range<f64> {
        self.band.clone()
    }
}

impl FeePolicy for RandomBandFee {
    fn fee_for(&self, _quote: &PriceQuote, _shares: f64) -> f64 {
        self.source.uniform(self.band.clone())
    }
}

/// Same fee on every reward
#[derive(Debug, Clone, Copy)]
pub struct FixedFee(pub f64);

impl FeePolicy for FixedFee {
    fn fee_for(&self, _quote: &PriceQuote, _shares: f64) -> f64 {
        self.0
    }
}
