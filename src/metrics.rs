//! Operational metrics for the scoring pipeline.

use crate::types::analysis::ThreatLevel;
use crate::types::outcome::ScoringOutcome;
use crate::types::transaction::Classification;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline activity
pub struct PipelineMetrics {
    /// Total transactions scored
    pub transactions_processed: AtomicU64,
    /// Requests dropped for bad payloads or invalid input
    pub requests_rejected: AtomicU64,
    /// Transactions that passed the analysis gate
    pub analyses_requested: AtomicU64,
    /// Analyses answered by the local fallback
    pub analysis_fallbacks: AtomicU64,
    by_classification: RwLock<HashMap<Classification, u64>>,
    by_threat_level: RwLock<HashMap<ThreatLevel, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            transactions_processed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            analyses_requested: AtomicU64::new(0),
            analysis_fallbacks: AtomicU64::new(0),
            by_classification: RwLock::new(HashMap::new()),
            by_threat_level: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed outcome
    pub fn record_outcome(&self, outcome: &ScoringOutcome, processing_time: Duration) {
        self.transactions_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (outcome.transaction.fraud_score * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_status) = self.by_classification.write() {
            *by_status.entry(outcome.transaction.status).or_insert(0) += 1;
        }

        if let Some(analysis) = &outcome.analysis {
            self.analyses_requested.fetch_add(1, Ordering::Relaxed);
            if outcome.used_fallback() {
                self.analysis_fallbacks.fetch_add(1, Ordering::Relaxed);
            }
            if let Ok(mut by_level) = self.by_threat_level.write() {
                *by_level.entry(analysis.threat_level).or_insert(0) += 1;
            }
        }
    }

    /// Record a request that could not be scored
    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (transactions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Share of analyses answered by the fallback (0.0 - 1.0)
    pub fn get_fallback_rate(&self) -> f64 {
        let requested = self.analyses_requested.load(Ordering::Relaxed);
        if requested == 0 {
            return 0.0;
        }
        self.analysis_fallbacks.load(Ordering::Relaxed) as f64 / requested as f64
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn get_classification_counts(&self) -> HashMap<Classification, u64> {
        self.by_classification
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_threat_level_counts(&self) -> HashMap<ThreatLevel, u64> {
        self.by_threat_level
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let tx_count = self.transactions_processed.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let analyses = self.analyses_requested.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let fallback_rate = self.get_fallback_rate();
        let by_status = self.get_classification_counts();
        let by_level = self.get_threat_level_counts();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             SMPC RISK PIPELINE - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions Scored:    {:>8}  │  Throughput: {:>6.1} tx/s ║",
            tx_count, throughput
        );
        info!(
            "║ Requests Rejected:      {:>8}  │  Analyses:   {:>8}     ║",
            rejected, analyses
        );
        info!(
            "║ Analysis Fallback Rate: {:>7.1}%                              ║",
            fallback_rate * 100.0
        );
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Classifications:                                             ║");
        for status in [Classification::Normal, Classification::Fraud, Classification::Pending] {
            let count = by_status.get(&status).copied().unwrap_or(0);
            let pct = if tx_count > 0 {
                (count as f64 / tx_count as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", status, count, pct);
        }
        info!("║ Threat Levels:                                               ║");
        for level in [ThreatLevel::Low, ThreatLevel::Medium, ThreatLevel::High] {
            let count = by_level.get(&level).copied().unwrap_or(0);
            info!("║   {:10}: {:>6}                                        ║", level, count);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Score Distribution:                                    ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "█".repeat(bar_len.min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::analysis::{AnalysisResult, AnalysisSource};
    use crate::types::shares::SmpcShares;
    use crate::types::transaction::Transaction;
    use chrono::Utc;

    fn outcome(fraud_score: f64, status: Classification, source: Option<AnalysisSource>) -> ScoringOutcome {
        let transaction = Transaction {
            id: "t".to_string(),
            subject_id: "sub_000000000000".to_string(),
            amount: 100.0,
            device_score: 0.5,
            fraud_score,
            status,
            created_at: Utc::now(),
            shares: SmpcShares::default(),
        };
        match source {
            None => ScoringOutcome::scored(transaction),
            Some(source) => ScoringOutcome::analyzed(
                transaction,
                AnalysisResult {
                    summary: "s".to_string(),
                    threat_level: ThreatLevel::High,
                    recommendation: "r".to_string(),
                },
                source,
            ),
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_outcome(&outcome(0.2, Classification::Normal, None), Duration::from_micros(100));
        metrics.record_outcome(
            &outcome(0.9, Classification::Fraud, Some(AnalysisSource::Fallback)),
            Duration::from_micros(300),
        );
        metrics.record_outcome(
            &outcome(1.0, Classification::Fraud, Some(AnalysisSource::Remote)),
            Duration::from_micros(200),
        );
        metrics.record_rejection();

        assert_eq!(metrics.transactions_processed.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.requests_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.analyses_requested.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.get_fallback_rate(), 0.5);
        assert_eq!(metrics.get_classification_counts()[&Classification::Fraud], 2);
        assert_eq!(metrics.get_threat_level_counts()[&ThreatLevel::High], 2);
        assert_eq!(metrics.get_processing_stats().mean_us, 200);
    }

    #[test]
    fn test_score_buckets() {
        let metrics = PipelineMetrics::new();
        metrics.record_outcome(&outcome(0.0, Classification::Normal, None), Duration::ZERO);
        metrics.record_outcome(&outcome(0.55, Classification::Normal, None), Duration::ZERO);
        metrics.record_outcome(&outcome(1.0, Classification::Fraud, None), Duration::ZERO);

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
    }
}
