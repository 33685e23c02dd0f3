use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Mutex;

/// Source of uniform draws used by fee and price policies
pub trait RandomSource: Send + Sync {
    /// Uniform draw from a non-empty half-open range
    fn uniform(&self, range: Range<f64>) -> f64;
}

/// Thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&self, range: Range<f64>) -> f64 {
        rand::thread_rng().gen_range(range)
    }
}

/// Deterministic generator: the same seed yields the same sequence of draws
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&self, range: Range<f64>) -> f64 {
        // A poisoned generator is still a valid generator
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(7);
        let b = SeededRandom::new(7);

        let xs: Vec<f64> = (0..5).map(|_| a.uniform(0.0..1.0)).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.uniform(0.0..1.0)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_draws_stay_in_range() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            let x = source.uniform(10.0..100.0);
            assert!((10.0..100.0).contains(&x));
        }
    }
}
