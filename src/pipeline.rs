//! Scoring workflow: score, gate, explain.

use crate::analysis::AnalysisGateway;
use crate::error::ScoringResult;
use crate::scoring::ScoreEngine;
use crate::types::outcome::ScoringOutcome;
use crate::types::transaction::{ScoringRequest, Transaction};
use anyhow::Context;
use rand::RngCore;
use tokio::sync::Semaphore;
use tracing::debug;

/// Runs one request through the score engine and, when the analysis gate
/// opens (FRAUD, or fraud score above the gate), through the gateway.
pub struct ScoringPipeline {
    engine: ScoreEngine,
    gateway: AnalysisGateway,
}

impl ScoringPipeline {
    pub fn new(engine: ScoreEngine, gateway: AnalysisGateway) -> Self {
        Self { engine, gateway }
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    pub fn gateway(&self) -> &AnalysisGateway {
        &self.gateway
    }

    /// Whether `txn` warrants an explanation: always for FRAUD, otherwise
    /// only when the fraud score is strictly above the analysis gate.
    pub fn needs_analysis(&self, txn: &Transaction) -> bool {
        txn.is_fraud() || txn.fraud_score > self.engine.config().analysis_gate
    }

    /// Score `request` and attach an explanation when warranted.
    ///
    /// Only input validation can fail; analysis problems degrade to the
    /// fallback explanation.
    pub async fn run<R: RngCore>(
        &self,
        request: &ScoringRequest,
        rng: &mut R,
    ) -> ScoringResult<ScoringOutcome> {
        let transaction = self.engine.process(&request.identity, request.amount, rng)?;

        if !self.needs_analysis(&transaction) {
            debug!(
                transaction_id = %transaction.id,
                fraud_score = transaction.fraud_score,
                "Below analysis gate"
            );
            return Ok(ScoringOutcome::scored(transaction));
        }

        let (analysis, source) = self.gateway.analyze_with_source(&transaction).await;
        Ok(ScoringOutcome::analyzed(transaction, analysis, source))
    }
}

/// Wait for every worker holding a permit of `semaphore` to finish, then
/// close it so no new work can start.
pub async fn drain_workers(semaphore: &Semaphore, workers: usize) -> anyhow::Result<()> {
    let permits = u32::try_from(workers).context("Worker count exceeds semaphore capacity")?;
    let _all = semaphore
        .acquire_many(permits)
        .await
        .context("Worker semaphore closed before drain")?;
    semaphore.close();
    Ok(())
}
