//! Scoring endpoint gateway
//!
//! The trained classifier is an opaque collaborator: it takes the feature
//! vector as a comma-separated decimal string and answers with a fraud
//! probability. The concrete implementation is a NATS request-reply call to
//! the configured endpoint subject.

use async_nats::Client;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring endpoint unavailable: {0}")]
    Transport(String),
    #[error("malformed scoring reply: {0}")]
    MalformedReply(String),
}

/// Submits one feature vector, returns one fraud probability in [0, 1].
#[async_trait]
pub trait ScoringGateway: Send + Sync {
    async fn invoke(&self, body: &str) -> Result<f64, ScoringError>;
}

/// Scoring endpoint reached over NATS request-reply. The reply body is a
/// JSON-encoded decimal.
pub struct NatsScoringEndpoint {
    client: Client,
    endpoint: String,
}

impl NatsScoringEndpoint {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ScoringGateway for NatsScoringEndpoint {
    async fn invoke(&self, body: &str) -> Result<f64, ScoringError> {
        debug!(endpoint = %self.endpoint, body = %body, "Invoking scoring endpoint");

        let reply = self
            .client
            .request(self.endpoint.clone(), body.as_bytes().to_vec().into())
            .await
            .map_err(|e| ScoringError::Transport(e.to_string()))?;

        let probability: f64 = serde_json::from_slice(&reply.payload)
            .map_err(|e| ScoringError::MalformedReply(e.to_string()))?;

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(ScoringError::MalformedReply(format!(
                "probability {probability} outside [0, 1]"
            )));
        }

        Ok(probability)
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FixedScoringEndpoint;
    use super::*;

    #[tokio::test]
    async fn test_fake_endpoint_records_bodies() {
        let endpoint = FixedScoringEndpoint::returning(0.42);
        let p = endpoint.invoke("68.17,0.1,1.4,0.03").await.unwrap();
        assert_eq!(p, 0.42);
        assert_eq!(endpoint.call_count(), 1);
        assert_eq!(endpoint.bodies.lock().unwrap()[0], "68.17,0.1,1.4,0.03");
    }
}
