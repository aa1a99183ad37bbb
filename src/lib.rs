//! Fraud Scoring Pipeline Library
//!
//! Real-time fraud scoring of credit-card transactions: behavioral features
//! are retrieved per card from a feature store, turned into ratio features
//! against the card's weekly baseline, and sent to a trained model endpoint.
//! A companion path persists streaming short-window aggregates back into the
//! feature store.

pub mod assembler;
pub mod clock;
pub mod config;
pub mod consumer;
pub mod freshness;
pub mod gateway;
pub mod metrics;
pub mod producer;
pub mod ratios;
pub mod scorer;
pub mod types;
pub mod updater;

pub use assembler::FeatureAssembler;
pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use consumer::BatchConsumer;
pub use freshness::FreshnessPolicy;
pub use gateway::{FeatureStoreGateway, KvFeatureStore, NatsScoringEndpoint, ScoringGateway};
pub use metrics::PipelineMetrics;
pub use producer::ResultPublisher;
pub use ratios::RatioCalculator;
pub use scorer::TransactionScorer;
pub use types::{AggregateBatch, FeatureVector, ScoringResult, TransactionBatch};
pub use updater::AggregateUpdater;
