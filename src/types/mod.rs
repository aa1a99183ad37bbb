//! Data types shared across the scoring and aggregation paths

pub mod aggregate;
pub mod event;
pub mod feature;

pub use aggregate::{LongWindowAggregate, RecordFieldError, ShortWindowAggregate};
pub use event::{
    AckBatch, AggregateBatch, AggregateEvent, AggregateRecord, PayloadError, RecordAck,
    ScoringResult, TransactionBatch, TransactionEvent, TransactionRecord,
};
pub use feature::FeatureVector;
