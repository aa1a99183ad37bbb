//! Fraud Scoring Pipeline - Main Entry Point
//!
//! Consumes transaction batches and streaming aggregate batches from NATS,
//! scores transactions against the model endpoint, and keeps the short-window
//! feature group current. Batches are processed in parallel per path.

use anyhow::Result;
use fraud_scoring_pipeline::{
    clock::SystemClock,
    config::AppConfig,
    consumer::BatchConsumer,
    gateway::{KvFeatureStore, NatsScoringEndpoint},
    metrics::{MetricsReporter, PipelineMetrics},
    producer::ResultPublisher,
    scorer::TransactionScorer,
    types::{AggregateBatch, TransactionBatch},
    updater::AggregateUpdater,
    FeatureAssembler,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Fraud Scoring Pipeline");
    info!(
        endpoint = %config.scoring.endpoint,
        fraud_threshold = config.scoring.fraud_threshold,
        short_window_group = %config.feature_store.short_window_group,
        long_window_group = %config.feature_store.long_window_group,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS; clients are built once and shared for the process
    // lifetime
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let jetstream = async_nats::jetstream::new(client.clone());
    let store = Arc::new(
        KvFeatureStore::open(
            &jetstream,
            &[
                config.feature_store.short_window_group.as_str(),
                config.feature_store.long_window_group.as_str(),
            ],
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to open feature store: {e}"))?,
    );
    info!("Feature store buckets resolved");

    let clock = Arc::new(SystemClock);
    let scoring = Arc::new(NatsScoringEndpoint::new(
        client.clone(),
        &config.scoring.endpoint,
    ));

    let assembler = FeatureAssembler::new(
        store.clone(),
        clock.clone(),
        &config.feature_store.short_window_group,
        &config.feature_store.long_window_group,
    );
    let scorer = Arc::new(TransactionScorer::new(
        assembler,
        scoring,
        clock.clone(),
        config.scoring.fraud_threshold,
        metrics.clone(),
    ));
    let updater = Arc::new(AggregateUpdater::new(
        store,
        clock,
        &config.feature_store.short_window_group,
        metrics.clone(),
    ));
    let publisher = Arc::new(ResultPublisher::new(
        client.clone(),
        &config.nats.score_subject,
        &config.nats.ack_subject,
    ));

    // Start metrics reporter
    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(async move {
        reporter.start().await;
    });

    let workers = config.pipeline.workers;
    info!(workers = workers, "Starting batch processing loops");

    let transaction_consumer = BatchConsumer::new(client.clone(), &config.nats.transaction_subject);
    let aggregate_consumer = BatchConsumer::new(client.clone(), &config.nats.aggregate_subject);

    let scoring_loop = tokio::spawn(run_scoring_loop(
        transaction_consumer,
        scorer,
        publisher.clone(),
        workers,
    ));
    let aggregation_loop = tokio::spawn(run_aggregation_loop(
        aggregate_consumer,
        updater,
        publisher,
        workers,
    ));

    let (scoring_result, aggregation_result) = tokio::try_join!(scoring_loop, aggregation_loop)?;
    scoring_result?;
    aggregation_result?;

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Scoring path: each message is one independent transaction batch.
async fn run_scoring_loop(
    consumer: BatchConsumer,
    scorer: Arc<TransactionScorer>,
    publisher: Arc<ResultPublisher>,
    workers: usize,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;
        let scorer = scorer.clone();
        let publisher = publisher.clone();

        tokio::spawn(async move {
            match serde_json::from_slice::<TransactionBatch>(&message.payload) {
                Ok(batch) => {
                    let results = scorer.score_batch(&batch).await;
                    if let Err(e) = publisher.publish_scores(&results).await {
                        error!(error = %e, "Failed to publish scoring results");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize transaction batch");
                }
            }
            drop(permit);
        });
    }

    Ok(())
}

/// Aggregation path: each message is one batch of short-window snapshots.
async fn run_aggregation_loop(
    consumer: BatchConsumer,
    updater: Arc<AggregateUpdater>,
    publisher: Arc<ResultPublisher>,
    workers: usize,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;
        let updater = updater.clone();
        let publisher = publisher.clone();

        tokio::spawn(async move {
            match serde_json::from_slice::<AggregateBatch>(&message.payload) {
                Ok(batch) => {
                    let acks = updater.apply_batch(&batch).await;
                    if let Err(e) = publisher.publish_acks(&acks).await {
                        error!(error = %e, "Failed to publish aggregate acks");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize aggregate batch");
                }
            }
            drop(permit);
        });
    }

    Ok(())
}
