//! Scoring-path orchestration: one batch in, a list of results out.

use crate::assembler::{AssembledFeatures, FeatureAssembler};
use crate::clock::Clock;
use crate::gateway::ScoringGateway;
use crate::metrics::PipelineMetrics;
use crate::types::event::STATUS_OK;
use crate::types::{ScoringResult, TransactionBatch, TransactionEvent};
use chrono::DateTime;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Scores every record in a transaction batch.
///
/// Each record is handled in isolation: decode failures, store failures, and
/// scoring failures drop that record only, and the batch result is the list
/// of events that made it all the way through.
pub struct TransactionScorer {
    assembler: FeatureAssembler,
    scoring: Arc<dyn ScoringGateway>,
    clock: Arc<dyn Clock>,
    fraud_threshold: f64,
    metrics: Arc<PipelineMetrics>,
}

impl TransactionScorer {
    pub fn new(
        assembler: FeatureAssembler,
        scoring: Arc<dyn ScoringGateway>,
        clock: Arc<dyn Clock>,
        fraud_threshold: f64,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            assembler,
            scoring,
            clock,
            fraud_threshold,
            metrics,
        }
    }

    /// Score a batch, returning one result per successfully scored event.
    pub async fn score_batch(&self, batch: &TransactionBatch) -> Vec<ScoringResult> {
        debug!(records = batch.records.len(), "Scoring transaction batch");
        let mut results = Vec::with_capacity(batch.records.len());

        for record in &batch.records {
            let started = Instant::now();

            let event = match record.decode_payload() {
                Ok(event) => event,
                Err(err) => {
                    warn!(
                        event_id = %record.event_id,
                        error = %err,
                        "Undecodable transaction payload, skipping event"
                    );
                    self.metrics.record_dropped("decode");
                    continue;
                }
            };

            info!(
                event_id = %record.event_id,
                cc_num = %event.cc_num,
                amount = event.amount,
                "Processing transaction event"
            );

            if let Some(trans_ts) = event.trans_ts {
                self.log_transit_delay(trans_ts);
            }

            let assembled = match self.assembler.assemble(&event.cc_num, event.amount).await {
                Ok(assembled) => assembled,
                Err(err) => {
                    error!(
                        event_id = %record.event_id,
                        error = %err,
                        "Feature assembly aborted, skipping event"
                    );
                    self.metrics.record_dropped("store");
                    continue;
                }
            };
            if assembled.stale {
                self.metrics.record_stale_window();
            }

            let prediction = match self.scoring.invoke(&assembled.vector.to_csv()).await {
                Ok(prediction) => prediction,
                Err(err) => {
                    error!(
                        event_id = %record.event_id,
                        error = %err,
                        "Scoring call failed, skipping event"
                    );
                    self.metrics.record_dropped("scoring");
                    continue;
                }
            };

            self.log_outcome(prediction, &event, &assembled);
            self.metrics.record_scored(started.elapsed(), prediction);

            results.push(ScoringResult {
                event_id: record.event_id.clone(),
                sequence_number: record.sequence_number.clone(),
                prediction,
                status_code: STATUS_OK,
            });
        }

        debug!(
            scored = results.len(),
            received = batch.records.len(),
            "Batch complete"
        );
        results
    }

    /// End-to-end delay from the transaction timestamp to now, when the
    /// producer supplied one.
    fn log_transit_delay(&self, trans_ts: f64) {
        let now = self.clock.epoch_seconds();
        let trans_time = DateTime::from_timestamp(trans_ts as i64, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| trans_ts.to_string());
        info!(
            trans_time = %trans_time,
            delay_secs = now - trans_ts,
            "Transaction transit delay"
        );
    }

    /// One line per prediction against the fraud threshold. The observed
    /// aggregates are only meaningful when the short window was fresh.
    fn log_outcome(&self, prediction: f64, event: &TransactionEvent, assembled: &AssembledFeatures) {
        let verdict = if prediction > self.fraud_threshold {
            "FRAUD"
        } else {
            "NOT FRAUD"
        };

        if assembled.stale {
            info!(
                verdict = verdict,
                prediction = format!("{prediction:.6}"),
                cc_num = %event.cc_num,
                amount = format!("{:.2}", event.amount),
                "Prediction (stale short window)"
            );
        } else {
            info!(
                verdict = verdict,
                prediction = format!("{prediction:.6}"),
                cc_num = %event.cc_num,
                amount = format!("{:.2}", event.amount),
                num_trans_last_10m = assembled.observed.get("num_trans_last_10m").map(String::as_str).unwrap_or("0"),
                avg_amt_last_10m = assembled.observed.get("avg_amt_last_10m").map(String::as_str).unwrap_or("0.0"),
                "Prediction"
            );
        }
        debug!(features_seen = ?assembled.observed, "Aggregate features used");
    }
}
