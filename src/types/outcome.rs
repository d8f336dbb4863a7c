//! Scoring outcome published by the pipeline

use super::analysis::{AnalysisResult, AnalysisSource};
use super::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// A scored transaction plus its explanation, when one was requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringOutcome {
    pub transaction: Transaction,

    /// Present exactly when the analysis gate opened
    pub analysis: Option<AnalysisResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_source: Option<AnalysisSource>,
}

impl ScoringOutcome {
    /// Outcome for a transaction that did not need an explanation
    pub fn scored(transaction: Transaction) -> Self {
        Self {
            transaction,
            analysis: None,
            analysis_source: None,
        }
    }

    /// Outcome for a transaction with an explanation attached
    pub fn analyzed(
        transaction: Transaction,
        analysis: AnalysisResult,
        source: AnalysisSource,
    ) -> Self {
        Self {
            transaction,
            analysis: Some(analysis),
            analysis_source: Some(source),
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.analysis_source == Some(AnalysisSource::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::analysis::ThreatLevel;
    use crate::types::shares::SmpcShares;
    use crate::types::transaction::Classification;
    use chrono::Utc;

    fn transaction() -> Transaction {
        Transaction {
            id: "t-1".to_string(),
            subject_id: "sub_abcdefabcdef".to_string(),
            amount: 9_800.0,
            device_score: 0.3,
            fraud_score: 0.836,
            status: Classification::Fraud,
            created_at: Utc::now(),
            shares: SmpcShares::default(),
        }
    }

    #[test]
    fn test_scored_outcome_omits_source() {
        let json = serde_json::to_value(ScoringOutcome::scored(transaction())).unwrap();
        assert!(json["analysis"].is_null());
        assert!(json.get("analysisSource").is_none());
    }

    #[test]
    fn test_analyzed_outcome_reports_fallback() {
        let analysis = AnalysisResult {
            summary: "s".to_string(),
            threat_level: ThreatLevel::High,
            recommendation: "r".to_string(),
        };
        let outcome = ScoringOutcome::analyzed(transaction(), analysis, AnalysisSource::Fallback);

        assert!(outcome.used_fallback());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["analysisSource"], "fallback");
        assert_eq!(json["analysis"]["threatLevel"], "High");
        assert_eq!(json["transaction"]["status"], "FRAUD");
    }
}
