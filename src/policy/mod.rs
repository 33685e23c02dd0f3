//! Pluggable fee and price generation.
//!
//! Randomness is injected through [`RandomSource`] so tests can pin outcomes
//! with [`SeededRandom`] or bypass it entirely with [`FixedFee`].

pub mod fee;
pub mod price;
pub mod random;

use std::ops::Range;

use crate::error::{AppError, AppResult};

pub use fee::{FeePolicy, FixedFee, RandomBandFee};
pub use price::{PricePolicy, UniformPriceBand};
pub use random::{RandomSource, SeededRandom, ThreadRandom};

fn check_band(name: &str, band: &Range<f64>, strictly_positive: bool) -> AppResult<()> {
    if !band.start.is_finite() || !band.end.is_finite() || band.start >= band.end {
        return Err(AppError::Config(format!(
            "{} band [{}, {}) is empty or not finite",
            name, band.start, band.end
        )));
    }
    if strictly_positive && band.start <= 0.0 {
        return Err(AppError::Config(format!("{} band must be strictly positive", name)));
    }
    if band.start < 0.0 {
        return Err(AppError::Config(format!("{} band must not be negative", name)));
    }
    Ok(())
}
