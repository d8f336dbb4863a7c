//! Configuration management for the scoring pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub scoring: ScoringConfig,
    pub analysis: AnalysisConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming scoring requests
    pub request_subject: String,
    /// Subject for outgoing scoring outcomes
    pub outcome_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "scoring.requests".to_string(),
            outcome_subject: "scoring.outcomes".to_string(),
        }
    }
}

/// Fraud scoring policy.
///
/// The defaults are the production policy; overriding them changes how
/// transactions are classified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Amount at which the normalized amount saturates at 1.0
    pub amount_ceiling: f64,
    /// Amounts strictly above this use the high amount weight
    pub high_amount_threshold: f64,
    pub high_amount_weight: f64,
    pub low_amount_weight: f64,
    pub device_weight: f64,
    /// Amounts strictly above this are always FRAUD
    pub hard_fraud_amount: f64,
    /// Scores strictly above this are FRAUD when the amount also clears `score_fraud_min_amount`
    pub score_fraud_threshold: f64,
    pub score_fraud_min_amount: f64,
    /// Scores strictly above this request an explanation even when NORMAL
    pub analysis_gate: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            amount_ceiling: 10_000.0,
            high_amount_threshold: 7_000.0,
            high_amount_weight: 0.7,
            low_amount_weight: 0.3,
            device_weight: 0.5,
            hard_fraud_amount: 9_500.0,
            score_fraud_threshold: 0.8,
            score_fraud_min_amount: 1_000.0,
            analysis_gate: 0.6,
        }
    }
}

/// Reasoning service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API credential
    pub api_key_env: String,
    /// Upper bound for a single outbound call
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AnalysisConfig {
    /// Read the credential from the process environment.
    ///
    /// Absence is not an error here; the gateway falls back on every call.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "ANALYSIS_API_KEY".to_string(),
            timeout_ms: 8_000,
            temperature: 0.2,
            max_tokens: 400,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of requests processed concurrently
    pub workers: usize,
    /// Interval between metrics summaries
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            metrics_interval_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file plus environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path plus environment overrides.
    ///
    /// A missing file is fine; every field has a default. Environment
    /// variables look like `SMPC_ANALYSIS__TIMEOUT_MS=2000`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("SMPC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
