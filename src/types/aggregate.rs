//! Typed views of the feature-store aggregate records.
//!
//! The store keeps every value as text; these types own the explicit decode
//! step from the raw name/value map into typed attributes, so malformed or
//! missing fields fail here and nowhere else.

use std::collections::HashMap;
use thiserror::Error;

/// Field names of the short-window feature group.
pub const FIELD_CC_NUM: &str = "cc_num";
pub const FIELD_AVG_AMT_10M: &str = "avg_amt_last_10m";
pub const FIELD_NUM_TRANS_10M: &str = "num_trans_last_10m";
pub const FIELD_TRANS_TIME: &str = "trans_time";

/// Field names of the long-window feature group.
pub const FIELD_AVG_AMT_1W: &str = "avg_amt_last_1w";
pub const FIELD_NUM_TRANS_1W: &str = "num_trans_last_1w";

/// Failure to map a raw store record onto a typed aggregate.
#[derive(Debug, Error)]
pub enum RecordFieldError {
    #[error("required field {0} missing from record")]
    Missing(&'static str),
    #[error("field {field} has malformed value {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// Rolling statistics over the trailing ten-minute window for one card,
/// stamped with the time the snapshot was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortWindowAggregate {
    pub cc_num: String,
    pub avg_amt_last_10m: f64,
    pub num_trans_last_10m: u64,
    /// Epoch seconds at which the aggregate was last written; 0.0 when the
    /// card has never been seen.
    pub trans_time: f64,
}

impl ShortWindowAggregate {
    /// Decode from the raw string-valued record, failing fast on a missing
    /// or malformed field.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, RecordFieldError> {
        Ok(Self {
            cc_num: string_field(fields, FIELD_CC_NUM)?,
            avg_amt_last_10m: f64_field(fields, FIELD_AVG_AMT_10M)?,
            num_trans_last_10m: u64_field(fields, FIELD_NUM_TRANS_10M)?,
            trans_time: f64_field(fields, FIELD_TRANS_TIME)?,
        })
    }

    /// Encode back into the string-valued record the store expects. The
    /// snapshot time is stored as a whole-second integer string.
    pub fn to_fields(&self) -> HashMap<String, String> {
        HashMap::from([
            (FIELD_CC_NUM.to_string(), self.cc_num.clone()),
            (
                FIELD_AVG_AMT_10M.to_string(),
                self.avg_amt_last_10m.to_string(),
            ),
            (
                FIELD_NUM_TRANS_10M.to_string(),
                self.num_trans_last_10m.to_string(),
            ),
            (
                FIELD_TRANS_TIME.to_string(),
                (self.trans_time.round() as i64).to_string(),
            ),
        ])
    }
}

/// Baseline statistics over the trailing one-week window for one card,
/// produced by a separate batch pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LongWindowAggregate {
    pub cc_num: String,
    pub avg_amt_last_1w: f64,
    pub num_trans_last_1w: u64,
}

impl LongWindowAggregate {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, RecordFieldError> {
        Ok(Self {
            cc_num: string_field(fields, FIELD_CC_NUM)?,
            avg_amt_last_1w: f64_field(fields, FIELD_AVG_AMT_1W)?,
            num_trans_last_1w: u64_field(fields, FIELD_NUM_TRANS_1W)?,
        })
    }
}

fn string_field(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<String, RecordFieldError> {
    fields
        .get(name)
        .cloned()
        .ok_or(RecordFieldError::Missing(name))
}

fn f64_field(fields: &HashMap<String, String>, name: &'static str) -> Result<f64, RecordFieldError> {
    let raw = fields.get(name).ok_or(RecordFieldError::Missing(name))?;
    raw.parse().map_err(|_| RecordFieldError::Malformed {
        field: name,
        value: raw.clone(),
    })
}

fn u64_field(fields: &HashMap<String, String>, name: &'static str) -> Result<u64, RecordFieldError> {
    let raw = fields.get(name).ok_or(RecordFieldError::Missing(name))?;
    raw.parse().map_err(|_| RecordFieldError::Malformed {
        field: name,
        value: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_record() -> HashMap<String, String> {
        HashMap::from([
            ("cc_num".to_string(), "4111".to_string()),
            ("avg_amt_last_10m".to_string(), "5.0".to_string()),
            ("num_trans_last_10m".to_string(), "2".to_string()),
            ("trans_time".to_string(), "1700000000".to_string()),
        ])
    }

    #[test]
    fn test_short_window_decode() {
        let agg = ShortWindowAggregate::from_fields(&short_record()).unwrap();
        assert_eq!(agg.cc_num, "4111");
        assert_eq!(agg.avg_amt_last_10m, 5.0);
        assert_eq!(agg.num_trans_last_10m, 2);
        assert_eq!(agg.trans_time, 1_700_000_000.0);
    }

    #[test]
    fn test_missing_field_fails_fast() {
        let mut fields = short_record();
        fields.remove("trans_time");
        assert!(matches!(
            ShortWindowAggregate::from_fields(&fields),
            Err(RecordFieldError::Missing("trans_time"))
        ));
    }

    #[test]
    fn test_malformed_value_names_the_field() {
        let mut fields = short_record();
        fields.insert("avg_amt_last_10m".to_string(), "lots".to_string());
        match ShortWindowAggregate::from_fields(&fields) {
            Err(RecordFieldError::Malformed { field, value }) => {
                assert_eq!(field, "avg_amt_last_10m");
                assert_eq!(value, "lots");
            }
            other => panic!("expected malformed-field error, got {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_time_encodes_as_whole_seconds() {
        let agg = ShortWindowAggregate {
            cc_num: "4111".to_string(),
            avg_amt_last_10m: 12.25,
            num_trans_last_10m: 4,
            trans_time: 1_699_999_999.6,
        };
        let fields = agg.to_fields();
        assert_eq!(fields["trans_time"], "1700000000");
        assert_eq!(fields["num_trans_last_10m"], "4");
    }

    #[test]
    fn test_long_window_decode() {
        let fields = HashMap::from([
            ("cc_num".to_string(), "4111".to_string()),
            ("avg_amt_last_1w".to_string(), "46.13".to_string()),
            ("num_trans_last_1w".to_string(), "60".to_string()),
        ]);
        let agg = LongWindowAggregate::from_fields(&fields).unwrap();
        assert_eq!(agg.avg_amt_last_1w, 46.13);
        assert_eq!(agg.num_trans_last_1w, 60);
    }
}
