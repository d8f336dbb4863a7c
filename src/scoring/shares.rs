//! Additive three-party split of a score

use crate::error::{ScoringError, ScoringResult};
use crate::types::shares::SmpcShares;
use rand::Rng;

/// Splits a value into three additive shares.
///
/// The first share is drawn uniformly from `[0, value)`, the second from
/// `[0, value - first)` and the third takes the remainder. Earlier shares are
/// larger on average, so the triple is not uniformly distributed and a single
/// share leaks magnitude. Callers rely on this exact arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareGenerator;

impl ShareGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Split `value` using randomness drawn from `rng`.
    ///
    /// Every share is non-negative and the shares sum to `value`. Zero splits
    /// to all-zero shares. Negative and non-finite values are rejected.
    pub fn split<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> ScoringResult<SmpcShares> {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoringError::InvalidShareValue(value));
        }

        if value == 0.0 {
            return Ok(SmpcShares::default());
        }

        // `gen::<f64>()` is in [0, 1), so each draw stays below its range
        // without calling gen_range on a possibly empty interval.
        let party_a = rng.gen::<f64>() * value;
        let remaining = value - party_a;
        let party_b = rng.gen::<f64>() * remaining;
        let party_c = remaining - party_b;

        Ok(SmpcShares {
            party_a,
            party_b,
            party_c,
        })
    }
}
