//! Transaction data structures for risk scoring

use super::shares::SmpcShares;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification outcome of a scored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Normal,
    Fraud,
    /// Not assigned by the current rules; reserved for review workflows.
    Pending,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Normal => "NORMAL",
            Classification::Fraud => "FRAUD",
            Classification::Pending => "PENDING",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Inbound request to score a single (identity, amount) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    /// Identity of the submitter, typically an email address
    #[serde(alias = "email")]
    pub identity: String,

    /// Monetary amount
    pub amount: f64,
}

impl ScoringRequest {
    pub fn new(identity: impl Into<String>, amount: f64) -> Self {
        Self {
            identity: identity.into(),
            amount,
        }
    }
}

/// A scored transaction.
///
/// Produced once per submission by the score engine and never mutated
/// afterwards. `fraud_score` and `device_score` lie in [0, 1] and `amount`
/// is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Random identity token
    pub id: String,

    /// Non-reversible display form of the submitter identity
    pub subject_id: String,

    pub amount: f64,

    /// Device risk signal (0.0 - 1.0)
    pub device_score: f64,

    /// Weighted fraud score (0.0 - 1.0)
    pub fraud_score: f64,

    pub status: Classification,

    pub created_at: DateTime<Utc>,

    /// Additive split of `fraud_score` across three parties
    pub shares: SmpcShares,
}

impl Transaction {
    pub fn is_fraud(&self) -> bool {
        self.status == Classification::Fraud
    }
}
