//! Aggregation-path orchestration: persist short-window snapshots.

use crate::clock::Clock;
use crate::gateway::FeatureStoreGateway;
use crate::metrics::PipelineMetrics;
use crate::types::{AckBatch, AggregateBatch, RecordAck, ShortWindowAggregate};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies a batch of streaming aggregate snapshots to the feature store.
///
/// Every record is acknowledged as accepted no matter what happened to it:
/// the upstream aggregation pipeline does not consume write failures, and an
/// unacknowledged record would only be redelivered with the same content.
pub struct AggregateUpdater {
    store: Arc<dyn FeatureStoreGateway>,
    clock: Arc<dyn Clock>,
    short_window_group: String,
    metrics: Arc<PipelineMetrics>,
}

impl AggregateUpdater {
    pub fn new(
        store: Arc<dyn FeatureStoreGateway>,
        clock: Arc<dyn Clock>,
        short_window_group: &str,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            clock,
            short_window_group: short_window_group.to_string(),
            metrics,
        }
    }

    /// Decode and write each record, returning one "Ok" ack per record.
    pub async fn apply_batch(&self, batch: &AggregateBatch) -> AckBatch {
        debug!(
            invocation_id = %batch.invocation_id,
            records = batch.records.len(),
            "Applying aggregate batch"
        );

        let mut acks = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            self.apply_record(record).await;
            acks.push(RecordAck::accepted(record.record_id.clone()));
        }
        AckBatch { records: acks }
    }

    async fn apply_record(&self, record: &crate::types::AggregateRecord) {
        let event = match record.decode_payload() {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    record_id = %record.record_id,
                    error = %err,
                    "Undecodable aggregate payload, record dropped"
                );
                return;
            }
        };

        info!(
            cc_num = %event.cc_num,
            avg_amt_last_10m = event.avg_amt_last_10m,
            num_trans_last_10m = event.num_trans_last_10m,
            "Updating short-window aggregates for card"
        );

        let snapshot = ShortWindowAggregate {
            cc_num: event.cc_num.clone(),
            avg_amt_last_10m: event.avg_amt_last_10m,
            num_trans_last_10m: event.num_trans_last_10m,
            trans_time: self.clock.epoch_seconds(),
        };

        match self
            .store
            .put_record(
                &self.short_window_group,
                &event.record_identifier(),
                &snapshot.to_fields(),
            )
            .await
        {
            Ok(()) => self.metrics.record_aggregate_write(),
            Err(err) => {
                error!(
                    record_id = %record.record_id,
                    cc_num = %event.cc_num,
                    error = %err,
                    "Aggregate write failed, record still acknowledged"
                );
            }
        }
    }
}
