//! SMPC Risk Pipeline Library
//!
//! Scores (identity, amount) submissions, splits each fraud score into three
//! simulated additive shares and explains risky results through an external
//! reasoning service, falling back to a local explanation when it fails.

pub mod analysis;
pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod producer;
pub mod scoring;
pub mod types;

pub use analysis::{AnalysisGateway, HttpReasoningClient, ReasoningService};
pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{AnalysisError, ScoringError};
pub use pipeline::ScoringPipeline;
pub use producer::OutcomeProducer;
pub use scoring::{RiskSignalProvider, ScoreEngine, ShareGenerator};
pub use types::{
    AnalysisResult, Classification, ScoringOutcome, ScoringRequest, SmpcShares, ThreatLevel,
    Transaction,
};
