//! Error types for scoring and analysis

use std::time::Duration;
use thiserror::Error;

/// Rejection of an input the scoring engine cannot score meaningfully
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("identity must not be empty")]
    EmptyIdentity,

    #[error("amount must be a finite non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("share value must be a finite non-negative number, got {0}")]
    InvalidShareValue(f64),

    /// The risk signal provider broke its contract of returning a number
    #[error("device signal from {provider} is not a finite number: {value}")]
    InvalidDeviceSignal { provider: &'static str, value: f64 },
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// Reason an analysis call did not produce a usable result.
///
/// Never returned from the gateway; it selects the fallback and is logged.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("request to reasoning service failed: {0}")]
    Transport(String),

    #[error("reasoning service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reasoning service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("reasoning service returned empty content")]
    EmptyResponse,

    #[error("malformed analysis response: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MissingCredential => "missing_credential",
            AnalysisError::Transport(_) => "transport",
            AnalysisError::Status { .. } => "status",
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::EmptyResponse => "empty_response",
            AnalysisError::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisError::Transport(err.to_string())
    }
}
