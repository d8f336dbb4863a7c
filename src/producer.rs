//! NATS message producer for scoring outcomes

use crate::types::outcome::ScoringOutcome;
use anyhow::{Context, Result};
use async_nats::Client;
use tracing::debug;

/// Producer for publishing scoring outcomes to NATS
#[derive(Clone)]
pub struct OutcomeProducer {
    client: Client,
    subject: String,
}

impl OutcomeProducer {
    /// Create a new outcome producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a scoring outcome
    pub async fn publish(&self, outcome: &ScoringOutcome) -> Result<()> {
        let payload = serde_json::to_vec(outcome).context("Failed to encode scoring outcome")?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .context("Failed to publish scoring outcome")?;

        debug!(
            transaction_id = %outcome.transaction.id,
            status = %outcome.transaction.status,
            analyzed = outcome.analysis.is_some(),
            "Published scoring outcome"
        );

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
