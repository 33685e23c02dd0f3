use std::ops::Range;
use std::sync::Arc;

use super::{check_band, RandomSource};
use crate::error::AppResult;

/// Produces the next synthetic price for a symbol
pub trait PricePolicy: Send + Sync {
    fn next_price(&self, symbol: &str, current: Option<f64>) -> f64;
}

/// Pure resampling from a fixed band; the previous price is ignored
pub struct UniformPriceBand {
    band: Range<f64>,
    source: Arc<dyn RandomSource>,
}

impl UniformPriceBand {
    pub fn new(band: Range<f64>, source: Arc<dyn RandomSource>) -> AppResult<Self> {
        check_band("price", &band, true)?;
        Ok(Self { band, source })
    }

    pub fn band(&self) -> Range<f64> {
        self.band.clone()
    }
}

impl PricePolicy for UniformPriceBand {
    fn next_price(&self, _symbol: &str, _current: Option<f64>) -> f64 {
        self.source.uniform(self.band.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SeededRandom;

    #[test]
    fn test_resampling_ignores_current_price() {
        let a = UniformPriceBand::new(1500.0..2000.0, Arc::new(SeededRandom::new(3))).unwrap();
        let b = UniformPriceBand::new(1500.0..2000.0, Arc::new(SeededRandom::new(3))).unwrap();

        let from_low = a.next_price("AAPL", Some(1.0));
        let from_none = b.next_price("AAPL", None);
        assert_eq!(from_low, from_none);
        assert!((1500.0..2000.0).contains(&from_low));
    }

    #[test]
    fn test_zero_lower_bound_rejected() {
        assert!(UniformPriceBand::new(0.0..10.0, Arc::new(SeededRandom::new(3))).is_err());
    }
}
