//! Transport envelopes and event payloads for the scoring and aggregation paths

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Status code attached to every successfully scored event.
pub const STATUS_OK: u16 = 200;

/// Error decoding the base64/JSON payload carried by a transport record.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A batch of transaction records delivered as one transport message.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionBatch {
    pub records: Vec<TransactionRecord>,
}

/// One transaction record inside a batch: an opaque identifier, the source
/// stream it came from, and a base64-encoded JSON payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub event_id: String,
    #[serde(default)]
    pub source_stream: String,
    pub sequence_number: String,
    pub data: String,
}

impl TransactionRecord {
    /// Decode the record payload into a transaction event.
    pub fn decode_payload(&self) -> Result<TransactionEvent, PayloadError> {
        decode_payload(&self.data)
    }
}

/// The decoded scoring-path payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEvent {
    /// Card identifier; digits, but upstream producers send it either as a
    /// JSON number or as a string.
    #[serde(deserialize_with = "de_card_number")]
    pub cc_num: String,
    /// Transaction amount in dollars.
    pub amount: f64,
    /// Transaction timestamp (epoch seconds), when the producer supplies one.
    #[serde(default)]
    pub trans_ts: Option<f64>,
}

impl TransactionEvent {
    /// Canonical feature-store record identifier for this card.
    pub fn record_identifier(&self) -> String {
        canonical_card_id(&self.cc_num)
    }
}

/// A batch of aggregation records delivered as one transport message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBatch {
    #[serde(default)]
    pub invocation_id: String,
    pub records: Vec<AggregateRecord>,
}

/// One aggregation record: a record identifier and a base64-encoded payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub record_id: String,
    pub data: String,
}

impl AggregateRecord {
    /// Decode the record payload into an aggregate event.
    pub fn decode_payload(&self) -> Result<AggregateEvent, PayloadError> {
        decode_payload(&self.data)
    }
}

/// The decoded aggregation-path payload: one short-window snapshot for a card.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateEvent {
    #[serde(deserialize_with = "de_card_number")]
    pub cc_num: String,
    pub num_trans_last_10m: u64,
    pub avg_amt_last_10m: f64,
}

impl AggregateEvent {
    /// Canonical feature-store record identifier for this card.
    pub fn record_identifier(&self) -> String {
        canonical_card_id(&self.cc_num)
    }
}

/// Result emitted for one successfully scored transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub event_id: String,
    pub sequence_number: String,
    pub prediction: f64,
    pub status_code: u16,
}

/// Per-record acknowledgment for the aggregation path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAck {
    pub record_id: String,
    pub result: String,
}

impl RecordAck {
    /// The source pipeline acknowledges every record as accepted so the
    /// transport never redelivers it.
    pub fn accepted(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            result: "Ok".to_string(),
        }
    }
}

/// Acknowledgment batch mirroring an incoming aggregate batch.
#[derive(Debug, Clone, Serialize)]
pub struct AckBatch {
    pub records: Vec<RecordAck>,
}

fn decode_payload<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, PayloadError> {
    let bytes = BASE64.decode(data)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Normalize a card identifier to its canonical integer-string form, matching
/// what the aggregation path uses as the store key.
pub fn canonical_card_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return n.to_string();
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return (f as u64).to_string();
    }
    trimmed.to_string()
}

fn de_card_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CardNumber {
        Int(u64),
        Float(f64),
        Text(String),
    }

    Ok(match CardNumber::deserialize(deserializer)? {
        CardNumber::Int(n) => n.to_string(),
        CardNumber::Float(f) => (f as u64).to_string(),
        CardNumber::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn encode(json: &serde_json::Value) -> String {
        BASE64.encode(serde_json::to_vec(json).unwrap())
    }

    #[test]
    fn test_decode_transaction_payload() {
        let record = TransactionRecord {
            event_id: "evt-1".to_string(),
            source_stream: "stream-a".to_string(),
            sequence_number: "42".to_string(),
            data: encode(&serde_json::json!({
                "cc_num": "4111111111111111",
                "amount": 68.17,
                "trans_ts": 1_700_000_000.0,
            })),
        };

        let event = record.decode_payload().unwrap();
        assert_eq!(event.cc_num, "4111111111111111");
        assert_eq!(event.amount, 68.17);
        assert_eq!(event.trans_ts, Some(1_700_000_000.0));
    }

    #[test]
    fn test_card_number_as_json_number() {
        let record = AggregateRecord {
            record_id: "rec-1".to_string(),
            data: encode(&serde_json::json!({
                "cc_num": 4111111111111111u64,
                "num_trans_last_10m": 3,
                "avg_amt_last_10m": 21.5,
            })),
        };

        let event = record.decode_payload().unwrap();
        assert_eq!(event.cc_num, "4111111111111111");
        assert_eq!(event.num_trans_last_10m, 3);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let record = TransactionRecord {
            event_id: "evt-1".to_string(),
            source_stream: String::new(),
            sequence_number: "1".to_string(),
            data: "not base64!!!".to_string(),
        };
        assert!(matches!(
            record.decode_payload(),
            Err(PayloadError::Base64(_))
        ));

        let record = TransactionRecord {
            event_id: "evt-2".to_string(),
            source_stream: String::new(),
            sequence_number: "2".to_string(),
            data: BASE64.encode(b"{\"cc_num\": }"),
        };
        assert!(matches!(record.decode_payload(), Err(PayloadError::Json(_))));
    }

    #[test]
    fn test_canonical_card_id() {
        assert_eq!(canonical_card_id("0004111"), "4111");
        assert_eq!(canonical_card_id(" 4111 "), "4111");
        assert_eq!(canonical_card_id("4111.0"), "4111");
        assert_eq!(canonical_card_id("not-a-number"), "not-a-number");
    }

    #[test]
    fn test_scoring_result_wire_format() {
        let result = ScoringResult {
            event_id: "evt-9".to_string(),
            sequence_number: "7".to_string(),
            prediction: 0.93,
            status_code: STATUS_OK,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["eventId"], "evt-9");
        assert_eq!(value["sequenceNumber"], "7");
        assert_eq!(value["statusCode"], 200);
    }

    #[test]
    fn test_ack_is_always_ok() {
        let ack = RecordAck::accepted("rec-3");
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["recordId"], "rec-3");
        assert_eq!(value["result"], "Ok");
    }
}
