//! Feature store gateway: point read and point write keyed by card identifier
//!
//! Records cross this boundary as maps of feature name to string-encoded
//! value; typed parsing is the caller's job. The concrete implementation is a
//! JetStream key-value bucket per feature group.

use async_nats::jetstream;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Store failures the pipeline distinguishes between: a record that simply
/// is not there, and a store that could not answer.
#[derive(Debug, Error)]
pub enum FeatureStoreError {
    #[error("no record for identifier")]
    NotFound,
    #[error("feature store unavailable: {0}")]
    Transport(String),
}

/// Point-read and point-write access to named feature groups.
#[async_trait]
pub trait FeatureStoreGateway: Send + Sync {
    /// Fetch the record for `record_id` from `group`. Values come back
    /// string-encoded, exactly as stored.
    async fn get_record(
        &self,
        group: &str,
        record_id: &str,
    ) -> Result<HashMap<String, String>, FeatureStoreError>;

    /// Write (or overwrite) the record for `record_id` in `group`.
    async fn put_record(
        &self,
        group: &str,
        record_id: &str,
        fields: &HashMap<String, String>,
    ) -> Result<(), FeatureStoreError>;
}

/// Feature store backed by JetStream key-value buckets, one per group.
/// Buckets are resolved once at startup; an unknown group afterwards is a
/// wiring bug and surfaces as a transport error.
pub struct KvFeatureStore {
    buckets: HashMap<String, jetstream::kv::Store>,
}

impl KvFeatureStore {
    /// Resolve the named buckets against the JetStream context.
    pub async fn open(
        context: &jetstream::Context,
        groups: &[&str],
    ) -> Result<Self, FeatureStoreError> {
        let mut buckets = HashMap::new();
        for group in groups {
            let store = context
                .get_key_value(*group)
                .await
                .map_err(|e| FeatureStoreError::Transport(e.to_string()))?;
            debug!(group = %group, "Resolved feature group bucket");
            buckets.insert(group.to_string(), store);
        }
        Ok(Self { buckets })
    }

    fn bucket(&self, group: &str) -> Result<&jetstream::kv::Store, FeatureStoreError> {
        self.buckets
            .get(group)
            .ok_or_else(|| FeatureStoreError::Transport(format!("unknown feature group {group}")))
    }
}

#[async_trait]
impl FeatureStoreGateway for KvFeatureStore {
    async fn get_record(
        &self,
        group: &str,
        record_id: &str,
    ) -> Result<HashMap<String, String>, FeatureStoreError> {
        let bucket = self.bucket(group)?;
        let entry = bucket
            .get(record_id)
            .await
            .map_err(|e| FeatureStoreError::Transport(e.to_string()))?;

        let bytes = entry.ok_or(FeatureStoreError::NotFound)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FeatureStoreError::Transport(format!("malformed stored record: {e}")))
    }

    async fn put_record(
        &self,
        group: &str,
        record_id: &str,
        fields: &HashMap<String, String>,
    ) -> Result<(), FeatureStoreError> {
        let bucket = self.bucket(group)?;
        let payload = serde_json::to_vec(fields)
            .map_err(|e| FeatureStoreError::Transport(e.to_string()))?;
        bucket
            .put(record_id, payload.into())
            .await
            .map_err(|e| FeatureStoreError::Transport(e.to_string()))?;
        debug!(group = %group, record_id = %record_id, "Wrote feature record");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::InMemoryFeatureStore;
    use super::*;

    #[tokio::test]
    async fn test_fake_store_round_trip() {
        let store = InMemoryFeatureStore::new();
        let fields = HashMap::from([("cc_num".to_string(), "4111".to_string())]);

        store.put_record("agg", "4111", &fields).await.unwrap();
        let read = store.get_record("agg", "4111").await.unwrap();
        assert_eq!(read["cc_num"], "4111");
    }

    #[tokio::test]
    async fn test_fake_store_distinguishes_not_found_from_transport() {
        let store = InMemoryFeatureStore::new();
        assert!(matches!(
            store.get_record("agg", "9999").await,
            Err(FeatureStoreError::NotFound)
        ));

        store.make_unreachable();
        assert!(matches!(
            store.get_record("agg", "9999").await,
            Err(FeatureStoreError::Transport(_))
        ));
    }
}
