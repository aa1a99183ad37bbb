//! NATS publisher for scoring results and aggregation acknowledgments

use crate::types::{AckBatch, ScoringResult};
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Publishes per-batch outputs: the list of scoring results on one subject,
/// aggregation acks on another.
#[derive(Clone)]
pub struct ResultPublisher {
    client: Client,
    score_subject: String,
    ack_subject: String,
}

impl ResultPublisher {
    pub fn new(client: Client, score_subject: &str, ack_subject: &str) -> Self {
        Self {
            client,
            score_subject: score_subject.to_string(),
            ack_subject: ack_subject.to_string(),
        }
    }

    /// Publish the results for one scored batch. An empty list is still
    /// published so downstream consumers see every batch accounted for.
    pub async fn publish_scores(&self, results: &[ScoringResult]) -> Result<()> {
        let payload = serde_json::to_vec(results)?;
        self.client
            .publish(self.score_subject.clone(), payload.into())
            .await?;

        debug!(
            subject = %self.score_subject,
            results = results.len(),
            "Published scoring results"
        );
        Ok(())
    }

    /// Publish the acknowledgment batch for one aggregate batch.
    pub async fn publish_acks(&self, acks: &AckBatch) -> Result<()> {
        let payload = serde_json::to_vec(acks)?;
        self.client
            .publish(self.ack_subject.clone(), payload.into())
            .await?;

        debug!(
            subject = %self.ack_subject,
            records = acks.records.len(),
            "Published aggregate acks"
        );
        Ok(())
    }

    pub fn score_subject(&self) -> &str {
        &self.score_subject
    }

    pub fn ack_subject(&self) -> &str {
        &self.ack_subject
    }
}

#[cfg(test)]
mod tests {
    // Publish behavior requires a running NATS server; covered by manual
    // end-to-end runs.
}
