//! SMPC Risk Pipeline - Main Entry Point
//!
//! Consumes scoring requests from NATS, scores and secret-shares each one,
//! explains risky results and publishes the outcomes.

use anyhow::{Context, Result};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use smpc_risk_pipeline::{
    analysis::{AnalysisGateway, HttpReasoningClient},
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, RequestConsumer},
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::{drain_workers, ScoringPipeline},
    producer::OutcomeProducer,
    scoring::ScoreEngine,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        format!("smpc_risk_pipeline={}", logging.level)
            .parse()
            .context("Invalid logging.level")?,
    );

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on unix
async fn wait_for_shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT (Ctrl+C) received",
                _ = sigterm.recv() => "SIGTERM received",
            },
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler; only Ctrl+C stops the pipeline");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT (Ctrl+C) received"
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT (Ctrl+C) received"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; an explicit path may be given as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    init_tracing(&config.logging)?;
    info!("Starting SMPC Risk Pipeline");
    info!(
        "Fraud rules: amount > {:.0}, or score > {:.2} with amount > {:.0}; analysis gate > {:.2}",
        config.scoring.hard_fraud_amount,
        config.scoring.score_fraud_threshold,
        config.scoring.score_fraud_min_amount,
        config.scoring.analysis_gate
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // Initialize components
    let engine = ScoreEngine::new(config.scoring.clone());
    info!(signal = engine.signal_name(), "Score engine initialized");

    let client = HttpReasoningClient::from_config(&config.analysis)?;
    if client.has_credential() {
        info!(endpoint = %client.endpoint(), model = %config.analysis.model, "Reasoning service configured");
    } else {
        warn!(
            env = %config.analysis.api_key_env,
            "No analysis credential set; explanations will use the baseline fallback"
        );
    }
    let gateway = AnalysisGateway::new(Arc::new(client), config.analysis.timeout());
    let pipeline = Arc::new(ScoringPipeline::new(engine, gateway));

    // Connect to NATS
    let nats = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(nats.clone(), &config.nats.request_subject);
    let producer = Arc::new(OutcomeProducer::new(nats.clone(), &config.nats.outcome_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Publishing outcomes to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;
    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let message = tokio::select! {
            reason = &mut shutdown => {
                info!(reason, "Stopping intake");
                break;
            }
            next = subscription.next() => match next {
                Some(message) => message,
                None => {
                    warn!("Request subscription closed");
                    break;
                }
            },
        };

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let request = match decode_request(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize scoring request");
                    metrics.record_rejection();
                    drop(permit);
                    return;
                }
            };

            // Each task draws from its own generator
            let mut rng = StdRng::from_entropy();

            match pipeline.run(&request, &mut rng).await {
                Ok(outcome) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_outcome(&outcome, processing_time);

                    let txn = &outcome.transaction;
                    if let Err(e) = producer.publish(&outcome).await {
                        error!(
                            transaction_id = %txn.id,
                            error = %e,
                            "Failed to publish scoring outcome"
                        );
                    } else if let Some(analysis) = &outcome.analysis {
                        info!(
                            transaction_id = %txn.id,
                            fraud_score = txn.fraud_score,
                            status = %txn.status,
                            threat_level = %analysis.threat_level,
                            fallback = outcome.used_fallback(),
                            processing_time_us = processing_time.as_micros(),
                            "Flagged transaction published"
                        );
                    } else {
                        debug!(
                            transaction_id = %txn.id,
                            fraud_score = txn.fraud_score,
                            processing_time_us = processing_time.as_micros(),
                            "Transaction published (below analysis gate)"
                        );
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} tx/s", metrics.get_throughput()),
                            avg_latency_us = stats.mean_us,
                            "Processing milestone"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, amount = request.amount, "Rejected scoring request");
                    metrics.record_rejection();
                }
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down, waiting for in-flight requests...");
    drain_workers(&semaphore, num_workers).await?;
    metrics.print_summary();

    Ok(())
}
