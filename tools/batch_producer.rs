//! Test Batch Producer
//!
//! Generates and publishes synthetic transaction and aggregate batches to
//! NATS for pipeline testing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// A small pool of cards so aggregates and transactions line up.
const CARDS: [&str; 5] = [
    "4111111111111111",
    "4222222222222222",
    "4333333333333333",
    "4444444444444444",
    "4555555555555555",
];

/// Batch generator for testing
struct BatchGenerator {
    rng: rand::rngs::ThreadRng,
    event_counter: u64,
}

impl BatchGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            event_counter: 0,
        }
    }

    fn encode(payload: &serde_json::Value) -> String {
        BASE64.encode(payload.to_string())
    }

    /// Generate one transaction batch with a mix of typical and outlier
    /// amounts.
    fn transaction_batch(&mut self, records: usize, outlier_rate: f64) -> serde_json::Value {
        let mut batch = Vec::with_capacity(records);
        for _ in 0..records {
            self.event_counter += 1;
            let card = CARDS[self.rng.gen_range(0..CARDS.len())];
            let amount = if self.rng.gen_bool(outlier_rate) {
                self.rng.gen_range(800.0..5000.0)
            } else {
                self.rng.gen_range(5.0..120.0)
            };

            let payload = serde_json::json!({
                "cc_num": card,
                "amount": (amount * 100.0_f64).round() / 100.0,
                "trans_ts": Utc::now().timestamp() as f64,
            });

            batch.push(serde_json::json!({
                "eventId": format!("evt_{:012}", self.event_counter),
                "sourceStream": "transactions",
                "sequenceNumber": self.event_counter.to_string(),
                "data": Self::encode(&payload),
            }));
        }
        serde_json::json!({ "records": batch })
    }

    /// Generate one aggregate batch covering every card in the pool.
    fn aggregate_batch(&mut self) -> serde_json::Value {
        let mut batch = Vec::with_capacity(CARDS.len());
        for (i, card) in CARDS.iter().enumerate() {
            self.event_counter += 1;
            let payload = serde_json::json!({
                "cc_num": card,
                "num_trans_last_10m": self.rng.gen_range(1..8),
                "avg_amt_last_10m": (self.rng.gen_range(5.0..90.0) * 100.0_f64).round() / 100.0,
            });
            batch.push(serde_json::json!({
                "recordId": format!("agg_{:012}_{i}", self.event_counter),
                "data": Self::encode(&payload),
            }));
        }
        serde_json::json!({
            "invocationId": format!("inv_{:012}", self.event_counter),
            "records": batch,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("batch_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Batch Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let transaction_subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let aggregate_subject = args.get(3).map(|s| s.as_str()).unwrap_or("aggregates");
    let batches: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let batch_size: usize = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(3);
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(500);

    info!(
        nats_url = %nats_url,
        transaction_subject = %transaction_subject,
        aggregate_subject = %aggregate_subject,
        batches = batches,
        batch_size = batch_size,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(batches, batch_size, delay_ms).await;
        }
    };

    let mut generator = BatchGenerator::new();

    info!("Publishing {} transaction batches...", batches);

    for i in 0..batches {
        // Refresh the short-window aggregates every few batches so the
        // scoring path sees fresh windows.
        if i % 5 == 0 {
            let agg = generator.aggregate_batch();
            let payload = serde_json::to_vec(&agg)?;
            client
                .publish(aggregate_subject.to_string(), payload.into())
                .await?;
        }

        let batch = generator.transaction_batch(batch_size, 0.1);
        let payload = serde_json::to_vec(&batch)?;
        client
            .publish(transaction_subject.to_string(), payload.into())
            .await?;

        if (i + 1) % 10 == 0 {
            info!("Published {}/{} batches", i + 1, batches);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Published {} transaction batches", batches);

    Ok(())
}

async fn run_dry_mode(batches: u64, batch_size: usize, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = BatchGenerator::new();

    for i in 0..batches {
        let batch = generator.transaction_batch(batch_size, 0.1);
        if (i + 1) % 10 == 0 || i == 0 {
            info!(
                "Sample batch {}:\n{}",
                i + 1,
                serde_json::to_string_pretty(&batch)?
            );
        }
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
