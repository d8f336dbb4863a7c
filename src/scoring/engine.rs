//! Fraud score engine
//!
//! Turns an (identity, amount) pair into a classified, secret-shared
//! [`Transaction`]. All randomness comes from the caller's random source.

use crate::config::ScoringConfig;
use crate::error::{ScoringError, ScoringResult};
use crate::scoring::shares::ShareGenerator;
use crate::scoring::signal::{round_to, RiskSignalProvider, SimulatedDeviceSignal};
use crate::types::transaction::{Classification, Transaction};
use chrono::Utc;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Intermediate values of a score computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub normalized_amount: f64,
    pub amount_weight: f64,
    pub device_weight: f64,
    pub raw_score: f64,
    /// `raw_score` rounded to 3 decimals and clamped to [0, 1]
    pub fraud_score: f64,
}

/// Scores and classifies transactions
pub struct ScoreEngine {
    config: ScoringConfig,
    signal: Box<dyn RiskSignalProvider>,
    shares: ShareGenerator,
}

impl ScoreEngine {
    /// Create an engine with the simulated device signal
    pub fn new(config: ScoringConfig) -> Self {
        Self::with_signal(config, Box::new(SimulatedDeviceSignal::new()))
    }

    /// Create an engine with a custom device signal source
    pub fn with_signal(config: ScoringConfig, signal: Box<dyn RiskSignalProvider>) -> Self {
        Self {
            config,
            signal,
            shares: ShareGenerator::new(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn signal_name(&self) -> &'static str {
        self.signal.name()
    }

    /// Score one submission.
    ///
    /// Every call yields a fresh transaction: id, device draw, shares and
    /// timestamp differ even for identical inputs.
    pub fn process<R: RngCore>(
        &self,
        identity: &str,
        amount: f64,
        rng: &mut R,
    ) -> ScoringResult<Transaction> {
        if identity.trim().is_empty() {
            return Err(ScoringError::EmptyIdentity);
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(ScoringError::InvalidAmount(amount));
        }

        let id = uuid::Builder::from_random_bytes(rng.gen::<[u8; 16]>())
            .into_uuid()
            .to_string();
        let subject_id = subject_id(identity);

        let signal = self.signal.device_score(identity, rng);
        if !signal.is_finite() {
            return Err(ScoringError::InvalidDeviceSignal {
                provider: self.signal.name(),
                value: signal,
            });
        }
        let device_score = signal.clamp(0.0, 1.0);
        let breakdown = self.score(amount, device_score);
        let status = self.classify(amount, breakdown.fraud_score);
        let shares = self.shares.split(breakdown.fraud_score, rng)?;

        debug!(
            transaction_id = %id,
            amount = amount,
            device_score = device_score,
            fraud_score = breakdown.fraud_score,
            status = %status,
            "Transaction scored"
        );

        Ok(Transaction {
            id,
            subject_id,
            amount,
            device_score,
            fraud_score: breakdown.fraud_score,
            status,
            created_at: Utc::now(),
            shares,
        })
    }

    /// Weighted score of an amount and a device signal
    pub fn score(&self, amount: f64, device_score: f64) -> ScoreBreakdown {
        let cfg = &self.config;

        let normalized_amount = (amount / cfg.amount_ceiling).min(1.0);
        let amount_weight = if amount > cfg.high_amount_threshold {
            cfg.high_amount_weight
        } else {
            cfg.low_amount_weight
        };

        let raw_score = normalized_amount * amount_weight + device_score * cfg.device_weight;
        let fraud_score = round_to(raw_score, 3).clamp(0.0, 1.0);

        ScoreBreakdown {
            normalized_amount,
            amount_weight,
            device_weight: cfg.device_weight,
            raw_score,
            fraud_score,
        }
    }

    /// Classify from the amount and the final fraud score.
    ///
    /// Never returns `Pending`.
    pub fn classify(&self, amount: f64, fraud_score: f64) -> Classification {
        let cfg = &self.config;

        let hard_limit = amount > cfg.hard_fraud_amount;
        let high_score = fraud_score > cfg.score_fraud_threshold && amount > cfg.score_fraud_min_amount;

        if hard_limit || high_score {
            Classification::Fraud
        } else {
            Classification::Normal
        }
    }

}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Short non-reversible display form of an identity.
///
/// Case and surrounding whitespace are ignored, so `Ana@Example.com ` and
/// `ana@example.com` map to the same subject.
pub fn subject_id(identity: &str) -> String {
    let normalized = identity.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("sub_{}", &hex::encode(digest)[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::signal::FixedDeviceSignal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn fixed_engine(device_score: f64) -> ScoreEngine {
        ScoreEngine::with_signal(
            ScoringConfig::default(),
            Box::new(FixedDeviceSignal(device_score)),
        )
    }

    #[test]
    fn test_scores_stay_in_range() {
        let engine = ScoreEngine::default();
        let mut rng = StdRng::seed_from_u64(2024);

        for i in 0..3_000 {
            let amount = match i % 5 {
                0 => 0.0,
                1 => rng.gen::<f64>() * 1_000.0,
                2 => rng.gen::<f64>() * 10_000.0,
                3 => 10_000.0 + rng.gen::<f64>() * 1e9,
                _ => f64::MAX,
            };
            let txn = engine.process("range@example.com", amount, &mut rng).unwrap();

            assert!((0.0..=1.0).contains(&txn.fraud_score), "{txn:?}");
            assert!((0.05..=0.95).contains(&txn.device_score), "{txn:?}");
            assert!((txn.shares.reconstruct() - txn.fraud_score).abs() <= 1e-9);
        }
    }

    #[test]
    fn test_hard_amount_limit_forces_fraud() {
        let mut rng = StdRng::seed_from_u64(8);
        for device_score in [0.05, 0.5, 0.95] {
            let txn = fixed_engine(device_score)
                .process("big@example.com", 10_000.0, &mut rng)
                .unwrap();
            assert_eq!(txn.status, Classification::Fraud);
        }

        let engine = ScoreEngine::default();
        for _ in 0..200 {
            let txn = engine.process("big@example.com", 10_000.0, &mut rng).unwrap();
            assert_eq!(txn.status, Classification::Fraud);
        }
    }

    #[test]
    fn test_small_amount_is_always_normal() {
        let engine = fixed_engine(0.95);
        let breakdown = engine.score(500.0, 0.95);

        assert_eq!(breakdown.normalized_amount, 0.05);
        assert_eq!(breakdown.amount_weight, 0.3);
        assert_eq!(breakdown.fraud_score, 0.49);

        let mut rng = StdRng::seed_from_u64(13);
        let txn = engine.process("small@example.com", 500.0, &mut rng).unwrap();
        assert_eq!(txn.fraud_score, 0.49);
        assert_eq!(txn.status, Classification::Normal);

        let engine = ScoreEngine::default();
        for _ in 0..500 {
            let txn = engine.process("small@example.com", 500.0, &mut rng).unwrap();
            assert_eq!(txn.status, Classification::Normal);
        }
    }

    #[test]
    fn test_weight_switches_above_threshold() {
        let engine = ScoreEngine::default();
        assert_eq!(engine.score(7_000.0, 0.5).amount_weight, 0.3);
        assert_eq!(engine.score(7_000.01, 0.5).amount_weight, 0.7);
    }

    #[test]
    fn test_score_is_rounded_to_three_decimals() {
        let engine = ScoreEngine::default();
        // 0.1234 * 0.3 + 0.33 * 0.5 = 0.20202
        let breakdown = engine.score(1_234.0, 0.33);
        assert!((breakdown.raw_score - 0.20202).abs() < 1e-12);
        assert_eq!(breakdown.fraud_score, 0.202);
    }

    #[test]
    fn test_high_score_rule_needs_amount_over_minimum() {
        let engine = ScoreEngine::default();
        assert_eq!(engine.classify(1_000.0, 0.95), Classification::Normal);
        assert_eq!(engine.classify(1_000.5, 0.81), Classification::Fraud);
        assert_eq!(engine.classify(5_000.0, 0.8), Classification::Normal);
        assert_eq!(engine.classify(9_500.0, 0.1), Classification::Normal);
        assert_eq!(engine.classify(9_500.01, 0.1), Classification::Fraud);
    }

    #[test]
    fn test_high_amount_with_risky_device_is_fraud() {
        // 0.9 * 0.7 + 0.9 * 0.5 = 1.08, clamped to 1.0
        let engine = fixed_engine(0.9);
        let mut rng = StdRng::seed_from_u64(21);
        let txn = engine.process("risky@example.com", 9_000.0, &mut rng).unwrap();

        assert_eq!(txn.fraud_score, 1.0);
        assert_eq!(txn.status, Classification::Fraud);
    }

    #[test]
    fn test_process_is_not_idempotent() {
        let engine = fixed_engine(0.6);
        let mut rng = StdRng::seed_from_u64(99);

        let first = engine.process("same@example.com", 4_200.0, &mut rng).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = engine.process("same@example.com", 4_200.0, &mut rng).unwrap();

        // Same inputs, fresh identity, timestamp and shares every time
        assert_ne!(first.id, second.id);
        assert_ne!(first.created_at, second.created_at);
        assert_ne!(first.shares, second.shares);
        assert_eq!(first.fraud_score, second.fraud_score);
        assert_eq!(first.subject_id, second.subject_id);
    }

    #[test]
    fn test_transaction_id_is_uuid_v4() {
        let engine = ScoreEngine::default();
        let mut rng = StdRng::seed_from_u64(4);
        let txn = engine.process("id@example.com", 10.0, &mut rng).unwrap();

        let parsed = Uuid::parse_str(&txn.id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_subject_id_is_stable_and_opaque() {
        let a = subject_id("Ana@Example.com ");
        let b = subject_id("ana@example.com");

        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.starts_with("sub_"));
        assert!(!a.contains("ana"));
        assert_ne!(subject_id("bob@example.com"), a);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let engine = ScoreEngine::default();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            engine.process("a@example.com", -1.0, &mut rng),
            Err(ScoringError::InvalidAmount(-1.0))
        );
        assert!(matches!(
            engine.process("a@example.com", f64::NAN, &mut rng),
            Err(ScoringError::InvalidAmount(_))
        ));
        assert!(engine.process("a@example.com", f64::INFINITY, &mut rng).is_err());
        assert_eq!(
            engine.process("   ", 10.0, &mut rng),
            Err(ScoringError::EmptyIdentity)
        );
    }

    /// Provider that hands back whatever it was given, unclamped
    struct RawSignal(f64);

    impl RiskSignalProvider for RawSignal {
        fn device_score(&self, _identity: &str, _rng: &mut dyn RngCore) -> f64 {
            self.0
        }

        fn name(&self) -> &'static str {
            "raw"
        }
    }

    #[test]
    fn test_non_finite_device_signal_is_rejected() {
        let mut rng = StdRng::seed_from_u64(6);

        let err = fixed_engine(f64::NAN)
            .process("nan@example.com", 100.0, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InvalidDeviceSignal { provider: "fixed", value } if value.is_nan()
        ));

        let engine = ScoreEngine::with_signal(
            ScoringConfig::default(),
            Box::new(RawSignal(f64::NEG_INFINITY)),
        );
        assert!(matches!(
            engine.process("inf@example.com", 100.0, &mut rng),
            Err(ScoringError::InvalidDeviceSignal { provider: "raw", .. })
        ));

        let engine = ScoreEngine::with_signal(ScoringConfig::default(), Box::new(RawSignal(3.0)));
        let txn = engine.process("high@example.com", 100.0, &mut rng).unwrap();
        assert_eq!(txn.device_score, 1.0);
    }
}
