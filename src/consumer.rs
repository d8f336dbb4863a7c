//! NATS message consumer for incoming scoring requests

use crate::types::transaction::ScoringRequest;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving scoring requests from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.subject))?;
        info!(subject = %self.subject, "Subscribed to scoring request subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload
pub fn decode_request(payload: &[u8]) -> Result<ScoringRequest> {
    serde_json::from_slice(payload).context("Invalid scoring request payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let request = decode_request(br#"{"identity": "ana@example.com", "amount": 120.0}"#).unwrap();
        assert_eq!(request.identity, "ana@example.com");
        assert_eq!(request.amount, 120.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_request(b"not json").is_err());
        assert!(decode_request(br#"{"identity": "a"}"#).is_err());
    }
}
