//! Feature assembly for one transaction
//!
//! Combines the current transaction amount with the card's short-window and
//! long-window aggregates into the model's feature vector. This module owns
//! the branching: which lookups happen, what counts as absent, and when the
//! whole event must be abandoned instead of scored.

use crate::clock::Clock;
use crate::freshness::FreshnessPolicy;
use crate::gateway::{FeatureStoreError, FeatureStoreGateway};
use crate::ratios::RatioCalculator;
use crate::types::event::canonical_card_id;
use crate::types::{FeatureVector, LongWindowAggregate, ShortWindowAggregate};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Assembly failed in a way that makes the event unscoreable.
///
/// Only a short-window store failure aborts: a record that is merely absent
/// (or unreadable field-by-field) zero-fills and scoring continues.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("short-window lookup failed: {0}")]
    ShortWindowUnavailable(#[source] FeatureStoreError),
}

/// Everything the scorer needs for one event: the complete feature vector,
/// the staleness verdict, and the raw feature values seen along the way for
/// diagnostic logging.
#[derive(Debug, Clone)]
pub struct AssembledFeatures {
    pub vector: FeatureVector,
    pub stale: bool,
    pub observed: HashMap<String, String>,
}

/// Builds the model input for one card and amount.
pub struct FeatureAssembler {
    store: Arc<dyn FeatureStoreGateway>,
    clock: Arc<dyn Clock>,
    policy: FreshnessPolicy,
    calculator: RatioCalculator,
    short_window_group: String,
    long_window_group: String,
}

impl FeatureAssembler {
    pub fn new(
        store: Arc<dyn FeatureStoreGateway>,
        clock: Arc<dyn Clock>,
        short_window_group: &str,
        long_window_group: &str,
    ) -> Self {
        Self {
            store,
            clock,
            policy: FreshnessPolicy::default(),
            calculator: RatioCalculator::new(),
            short_window_group: short_window_group.to_string(),
            long_window_group: long_window_group.to_string(),
        }
    }

    /// Override the default ten-minute staleness cutoff.
    pub fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble the feature vector for one transaction.
    ///
    /// The long-window lookup is skipped entirely once the short window is
    /// known stale; its result could only be zero-filled anyway, and the
    /// saved round trip is observable, intended behavior.
    pub async fn assemble(
        &self,
        cc_num: &str,
        amount: f64,
    ) -> Result<AssembledFeatures, AssembleError> {
        let record_id = canonical_card_id(cc_num);
        let mut observed = HashMap::new();

        let short = self.lookup_short_window(&record_id, &mut observed).await?;
        let (avg_amt_10m, num_trans_10m, snapshot) = match &short {
            Some(agg) => (agg.avg_amt_last_10m, agg.num_trans_last_10m, agg.trans_time),
            None => (0.0, 0, 0.0),
        };

        let now = self.clock.epoch_seconds();
        let stale = self.policy.is_stale(snapshot, now);
        debug!(
            record_id = %record_id,
            snapshot = snapshot,
            age = now - snapshot,
            stale = stale,
            "Evaluated short-window freshness"
        );

        let long = if stale {
            None
        } else {
            self.lookup_long_window(&record_id, &mut observed).await
        };
        let (avg_amt_1w, num_trans_1w) = match &long {
            Some(agg) => (agg.avg_amt_last_1w, agg.num_trans_last_1w),
            None => (0.0, 0),
        };

        let ratios = self.calculator.compute(
            amount,
            avg_amt_10m,
            avg_amt_1w,
            num_trans_10m,
            num_trans_1w,
            stale,
        );

        Ok(AssembledFeatures {
            vector: self.calculator.to_vector(amount, ratios),
            stale,
            observed,
        })
    }

    /// Short-window lookup. Absent or unparseable records zero-fill; a store
    /// that cannot answer aborts the event.
    async fn lookup_short_window(
        &self,
        record_id: &str,
        observed: &mut HashMap<String, String>,
    ) -> Result<Option<ShortWindowAggregate>, AssembleError> {
        match self
            .store
            .get_record(&self.short_window_group, record_id)
            .await
        {
            Ok(fields) => {
                observed.extend(fields.clone());
                match ShortWindowAggregate::from_fields(&fields) {
                    Ok(agg) => Ok(Some(agg)),
                    Err(err) => {
                        warn!(
                            group = %self.short_window_group,
                            record_id = %record_id,
                            error = %err,
                            "Unreadable short-window record, treating as absent"
                        );
                        Ok(None)
                    }
                }
            }
            Err(FeatureStoreError::NotFound) => {
                warn!(
                    group = %self.short_window_group,
                    record_id = %record_id,
                    "No short-window record for card"
                );
                Ok(None)
            }
            Err(err) => {
                error!(
                    group = %self.short_window_group,
                    record_id = %record_id,
                    error = %err,
                    "Short-window lookup failed, abandoning event"
                );
                Err(AssembleError::ShortWindowUnavailable(err))
            }
        }
    }

    /// Long-window lookup. Every failure mode zero-fills; the baseline being
    /// unavailable is recoverable because the ratio arithmetic already
    /// guards the zero denominator.
    async fn lookup_long_window(
        &self,
        record_id: &str,
        observed: &mut HashMap<String, String>,
    ) -> Option<LongWindowAggregate> {
        match self
            .store
            .get_record(&self.long_window_group, record_id)
            .await
        {
            Ok(fields) => {
                observed.extend(fields.clone());
                match LongWindowAggregate::from_fields(&fields) {
                    Ok(agg) => Some(agg),
                    Err(err) => {
                        warn!(
                            group = %self.long_window_group,
                            record_id = %record_id,
                            error = %err,
                            "Unreadable long-window record, treating as absent"
                        );
                        None
                    }
                }
            }
            Err(FeatureStoreError::NotFound) => {
                warn!(
                    group = %self.long_window_group,
                    record_id = %record_id,
                    "No long-window record for card"
                );
                None
            }
            Err(err) => {
                error!(
                    group = %self.long_window_group,
                    record_id = %record_id,
                    error = %err,
                    "Long-window lookup failed, zero-filling baseline"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::gateway::feature_store::fakes::InMemoryFeatureStore;

    const NOW: f64 = 1_700_000_000.0;
    const SHORT_GROUP: &str = "cc-agg";
    const LONG_GROUP: &str = "cc-agg-batch";
    const CARD: &str = "4111111111111111";

    fn assembler(store: Arc<InMemoryFeatureStore>) -> FeatureAssembler {
        FeatureAssembler::new(
            store,
            Arc::new(FixedClock(NOW)),
            SHORT_GROUP,
            LONG_GROUP,
        )
    }

    fn seed_short(store: &InMemoryFeatureStore, trans_time: f64) {
        store.insert(
            SHORT_GROUP,
            CARD,
            HashMap::from([
                ("cc_num".to_string(), CARD.to_string()),
                ("avg_amt_last_10m".to_string(), "5.0".to_string()),
                ("num_trans_last_10m".to_string(), "2".to_string()),
                ("trans_time".to_string(), trans_time.to_string()),
            ]),
        );
    }

    fn seed_long(store: &InMemoryFeatureStore) {
        store.insert(
            LONG_GROUP,
            CARD,
            HashMap::from([
                ("cc_num".to_string(), CARD.to_string()),
                ("avg_amt_last_1w".to_string(), "46.13".to_string()),
                ("num_trans_last_1w".to_string(), "60".to_string()),
            ]),
        );
    }

    #[tokio::test]
    async fn test_fresh_windows_produce_real_ratios() {
        let store = Arc::new(InMemoryFeatureStore::new());
        seed_short(&store, NOW - 30.0);
        seed_long(&store);

        let assembled = assembler(store.clone()).assemble(CARD, 68.17).await.unwrap();

        assert!(!assembled.stale);
        assert_eq!(assembled.vector.amount, 68.17);
        assert!((assembled.vector.amt_ratio1 - 0.1084).abs() < 1e-4);
        assert!((assembled.vector.amt_ratio2 - 1.4778).abs() < 1e-4);
        assert!((assembled.vector.count_ratio - 0.0333).abs() < 1e-4);
        assert_eq!(store.get_call_count(), 2);
        // Raw values from both lookups are kept for diagnostics.
        assert_eq!(assembled.observed["avg_amt_last_10m"], "5.0");
        assert_eq!(assembled.observed["num_trans_last_1w"], "60");
    }

    #[tokio::test]
    async fn test_never_seen_card_scores_with_zero_ratios() {
        let store = Arc::new(InMemoryFeatureStore::new());
        seed_long(&store);

        let assembled = assembler(store.clone()).assemble(CARD, 25.0).await.unwrap();

        assert!(assembled.stale);
        assert_eq!(assembled.vector.amount, 25.0);
        assert_eq!(assembled.vector.amt_ratio1, 0.0);
        assert_eq!(assembled.vector.amt_ratio2, 0.0);
        assert_eq!(assembled.vector.count_ratio, 0.0);
    }

    #[tokio::test]
    async fn test_stale_window_skips_long_lookup() {
        let store = Arc::new(InMemoryFeatureStore::new());
        seed_short(&store, NOW - 3600.0);
        seed_long(&store);

        let assembled = assembler(store.clone()).assemble(CARD, 68.17).await.unwrap();

        assert!(assembled.stale);
        assert_eq!(assembled.vector.amt_ratio1, 0.0);
        // One store round trip, not two: the baseline read is elided.
        assert_eq!(store.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_fresh_window_without_baseline_zero_fills() {
        let store = Arc::new(InMemoryFeatureStore::new());
        seed_short(&store, NOW - 30.0);

        let assembled = assembler(store.clone()).assemble(CARD, 68.17).await.unwrap();

        assert!(!assembled.stale);
        assert_eq!(assembled.vector.amt_ratio1, 0.0);
        assert_eq!(assembled.vector.amt_ratio2, 0.0);
        assert_eq!(assembled.vector.count_ratio, 0.0);
        assert_eq!(store.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts_the_event() {
        let store = Arc::new(InMemoryFeatureStore::new());
        store.make_unreachable();

        let result = assembler(store).assemble(CARD, 68.17).await;
        assert!(matches!(
            result,
            Err(AssembleError::ShortWindowUnavailable(
                FeatureStoreError::Transport(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_short_record_is_treated_as_absent() {
        let store = Arc::new(InMemoryFeatureStore::new());
        store.insert(
            SHORT_GROUP,
            CARD,
            HashMap::from([("cc_num".to_string(), CARD.to_string())]),
        );
        seed_long(&store);

        let assembled = assembler(store).assemble(CARD, 68.17).await.unwrap();
        assert!(assembled.stale);
        assert_eq!(assembled.vector.amt_ratio1, 0.0);
    }

    #[tokio::test]
    async fn test_assembly_is_idempotent() {
        let store = Arc::new(InMemoryFeatureStore::new());
        seed_short(&store, NOW - 30.0);
        seed_long(&store);
        let assembler = assembler(store);

        let first = assembler.assemble(CARD, 68.17).await.unwrap();
        let second = assembler.assemble(CARD, 68.17).await.unwrap();
        assert_eq!(first.vector, second.vector);
        assert_eq!(first.stale, second.stale);
    }

    #[tokio::test]
    async fn test_card_id_is_normalized_for_lookup() {
        let store = Arc::new(InMemoryFeatureStore::new());
        seed_short(&store, NOW - 30.0);
        seed_long(&store);

        // Leading zeros normalize away to the canonical integer form.
        let padded = format!("0{CARD}");
        let assembled = assembler(store).assemble(&padded, 68.17).await.unwrap();
        assert!(!assembled.stale);
        assert!((assembled.vector.amt_ratio1 - 0.1084).abs() < 1e-4);
    }
}
