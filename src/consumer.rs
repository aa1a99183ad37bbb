//! NATS consumer for incoming record batches

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes to one of the batch subjects (transactions or aggregates).
pub struct BatchConsumer {
    client: Client,
    subject: String,
}

impl BatchConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the batch subject.
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to batch subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Subscription behavior requires a running NATS server; covered by the
    // batch_producer tool in manual runs.
}
