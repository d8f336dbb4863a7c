//! Resilient analysis gateway
//!
//! Asks the reasoning service to explain a scored transaction. Every failure
//! (missing credential, transport, timeout, empty or malformed reply) is
//! logged and replaced by a deterministic explanation derived from the fraud
//! score, so callers always receive a result.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::client::{Message, ReasoningService};
use crate::error::AnalysisError;
use crate::types::analysis::{AnalysisResult, AnalysisSource, ThreatLevel};
use crate::types::transaction::Transaction;

pub const FALLBACK_SUMMARY: &str =
    "Automated analysis is unavailable. Baseline risk scoring is in effect.";

pub const FALLBACK_RECOMMENDATION: &str =
    "Manual verification required before this transaction is approved.";

/// Fallback threat level is High strictly above this fraud score
pub const FALLBACK_HIGH_THRESHOLD: f64 = 0.7;

const SYSTEM_PROMPT: &str = "You are a payment fraud analyst. You explain risk scores produced by \
a privacy-preserving scoring engine. Always respond with a single valid JSON object.";

const ANALYSIS_PROMPT: &str = r#"Analyze this scored payment transaction.

Amount: {amount}
Device risk signal (0-1): {device_score}
Fraud score (0-1): {fraud_score}
Classification: {status}

Explain the main risk drivers in one or two sentences, rate the threat, and
recommend an action for the operations team.

Respond ONLY with JSON in this exact format:
{
  "summary": "short explanation",
  "threatLevel": "Low" | "Medium" | "High",
  "recommendation": "next step"
}"#;

/// Reply shape expected from the reasoning service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReply {
    summary: String,
    threat_level: ThreatLevel,
    recommendation: String,
}

/// Explains classified transactions, falling back locally on failure.
///
/// Stateless between calls; performs at most one outbound attempt per call.
#[derive(Clone)]
pub struct AnalysisGateway {
    service: Arc<dyn ReasoningService>,
    timeout: Duration,
}

impl AnalysisGateway {
    pub fn new(service: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Explain `txn`. Never fails.
    pub async fn analyze(&self, txn: &Transaction) -> AnalysisResult {
        self.analyze_with_source(txn).await.0
    }

    /// Explain `txn` and report whether the result came from the service.
    pub async fn analyze_with_source(&self, txn: &Transaction) -> (AnalysisResult, AnalysisSource) {
        match self.request(txn).await {
            Ok(result) => {
                debug!(
                    transaction_id = %txn.id,
                    threat_level = %result.threat_level,
                    "Analysis received"
                );
                (result, AnalysisSource::Remote)
            }
            Err(e) => {
                warn!(
                    transaction_id = %txn.id,
                    fraud_score = txn.fraud_score,
                    reason = e.kind(),
                    error = %e,
                    "Analysis unavailable, using baseline explanation"
                );
                (fallback_analysis(txn), AnalysisSource::Fallback)
            }
        }
    }

    async fn request(&self, txn: &Transaction) -> Result<AnalysisResult, AnalysisError> {
        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(&build_prompt(txn))];

        let reply = tokio::time::timeout(self.timeout, self.service.complete(messages))
            .await
            .map_err(|_| AnalysisError::Timeout(self.timeout))??;

        parse_reply(&reply)
    }
}

/// Deterministic explanation derived only from the fraud score
pub fn fallback_analysis(txn: &Transaction) -> AnalysisResult {
    let threat_level = if txn.fraud_score > FALLBACK_HIGH_THRESHOLD {
        ThreatLevel::High
    } else {
        ThreatLevel::Low
    };

    AnalysisResult {
        summary: FALLBACK_SUMMARY.to_string(),
        threat_level,
        recommendation: FALLBACK_RECOMMENDATION.to_string(),
    }
}

fn build_prompt(txn: &Transaction) -> String {
    ANALYSIS_PROMPT
        .replace("{amount}", &format!("{:.2}", txn.amount))
        .replace("{device_score}", &format!("{:.2}", txn.device_score))
        .replace("{fraud_score}", &format!("{:.3}", txn.fraud_score))
        .replace("{status}", txn.status.as_str())
}

fn parse_reply(reply: &str) -> Result<AnalysisResult, AnalysisError> {
    if reply.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let json = extract_json(reply)?;
    let parsed: AnalysisReply = serde_json::from_str(json)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let summary = parsed.summary.trim();
    let recommendation = parsed.recommendation.trim();
    if summary.is_empty() || recommendation.is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "summary and recommendation must not be empty".to_string(),
        ));
    }

    Ok(AnalysisResult {
        summary: summary.to_string(),
        threat_level: parsed.threat_level,
        recommendation: recommendation.to_string(),
    })
}

/// Locate the JSON object in a reply that may wrap it in prose or a code fence
fn extract_json(text: &str) -> Result<&str, AnalysisError> {
    let text = text.trim();

    if text.starts_with('{') && text.ends_with('}') {
        return Ok(text);
    }

    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        let body = body.strip_prefix("json").unwrap_or(body);
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Ok(inner);
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Ok(&text[start..=end]);
        }
    }

    let preview: String = text.chars().take(80).collect();
    Err(AnalysisError::MalformedResponse(format!(
        "no JSON object in reply: {preview}"
    )))
}
