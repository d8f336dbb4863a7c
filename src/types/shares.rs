//! Simulated secret-shared representation of a score

use serde::{Deserialize, Serialize};

/// Three additive shares of a value, one per simulated party.
///
/// `party_a + party_b + party_c` equals the split value up to floating-point
/// error. This is a simulation; a single share leaks magnitude information.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmpcShares {
    pub party_a: f64,
    pub party_b: f64,
    pub party_c: f64,
}

impl SmpcShares {
    /// Recombine the shares
    pub fn reconstruct(&self) -> f64 {
        self.party_a + self.party_b + self.party_c
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.party_a, self.party_b, self.party_c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct() {
        let shares = SmpcShares {
            party_a: 0.5,
            party_b: 0.25,
            party_c: 0.125,
        };
        assert_eq!(shares.reconstruct(), 0.875);
        assert_eq!(shares.as_array(), [0.5, 0.25, 0.125]);
    }
}
