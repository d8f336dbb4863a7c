//! Scoring Request Producer
//!
//! Generates and publishes synthetic scoring requests to NATS for pipeline
//! testing. Without a NATS server it scores the requests locally instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smpc_risk_pipeline::{
    analysis::{AnalysisGateway, HttpReasoningClient},
    config::AnalysisConfig,
    pipeline::ScoringPipeline,
    scoring::ScoreEngine,
    types::ScoringRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Request generator for testing
struct RequestGenerator {
    rng: StdRng,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// An everyday purchase, well below every fraud rule
    fn generate_routine(&mut self) -> ScoringRequest {
        let identity = self.random_identity();
        ScoringRequest::new(identity, round_cents(self.rng.gen_range(5.0..1_000.0)))
    }

    /// A large transfer that lands near or above the fraud thresholds
    fn generate_high_amount(&mut self) -> ScoringRequest {
        let identity = self.random_identity();
        ScoringRequest::new(identity, round_cents(self.rng.gen_range(6_500.0..12_000.0)))
    }

    fn random_identity(&mut self) -> String {
        let name = self.random_choice(&["ana", "bruno", "chen", "dara", "eli", "farah", "goran"]);
        let domain = self.random_choice(&["example.com", "mail.test", "corp.example"]);
        format!("{}{}@{}", name, self.rng.gen_range(1..500), domain)
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    info!("Starting Scoring Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("scoring.requests");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let high_amount_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.2f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        high_amount_rate = high_amount_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, high_amount_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = StdRng::from_entropy();

    info!("Starting to publish {} requests...", count);

    let mut routine_count = 0;
    let mut high_amount_count = 0;

    for i in 0..count {
        let request = if rng.gen_bool(high_amount_rate) {
            high_amount_count += 1;
            generator.generate_high_amount()
        } else {
            routine_count += 1;
            generator.generate_routine()
        };

        let payload = serde_json::to_vec(&request)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} routine, {} high amount)",
                i + 1,
                count,
                routine_count,
                high_amount_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;

    info!(
        "Completed! Published {} requests ({} routine, {} high amount)",
        count, routine_count, high_amount_count
    );

    Ok(())
}

/// Score requests in-process and log sample outcomes.
///
/// No credential is passed, so every explanation is the baseline fallback.
async fn run_dry_mode(count: u64, high_amount_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let analysis = AnalysisConfig::default();
    let gateway = AnalysisGateway::new(
        Arc::new(HttpReasoningClient::new(&analysis, None)?),
        analysis.timeout(),
    );
    let pipeline = ScoringPipeline::new(ScoreEngine::default(), gateway);

    let mut generator = RequestGenerator::new();
    let mut rng = StdRng::from_entropy();

    for i in 0..count {
        let request = if rng.gen_bool(high_amount_rate) {
            generator.generate_high_amount()
        } else {
            generator.generate_routine()
        };

        let outcome = pipeline.run(&request, &mut rng).await?;
        let json = serde_json::to_string_pretty(&outcome)?;

        if (i + 1) % 10 == 0 || i == 0 || outcome.analysis.is_some() {
            info!("Sample outcome {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
