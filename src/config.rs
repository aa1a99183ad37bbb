//! Configuration management for the fraud scoring pipeline
//!
//! Every knob is settable from the optional `config/config.toml` file or
//! environment-style (`FRAUD_SCORING__ENDPOINT=...`), with the environment
//! taking precedence.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub feature_store: FeatureStoreConfig,
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection and subject configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject carrying transaction batches
    pub transaction_subject: String,
    /// Subject carrying streaming aggregate batches
    pub aggregate_subject: String,
    /// Subject scoring results are published to
    pub score_subject: String,
    /// Subject aggregate acknowledgments are published to
    pub ack_subject: String,
}

/// Feature group identifiers in the feature store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureStoreConfig {
    /// Feature group holding the streaming ten-minute aggregates
    pub short_window_group: String,
    /// Feature group holding the batch-computed one-week aggregates
    pub long_window_group: String,
}

/// Scoring endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Request-reply subject of the model endpoint
    pub endpoint: String,
    /// Probability above which a prediction is logged as fraud
    pub fraud_threshold: f64,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of batches processed concurrently per path
    pub workers: usize,
    /// Metrics summary interval in seconds
    pub metrics_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file path plus the environment.
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific file path plus the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            feature_store: FeatureStoreConfig::default(),
            scoring: ScoringConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            transaction_subject: "transactions".to_string(),
            aggregate_subject: "aggregates".to_string(),
            score_subject: "fraud.scores".to_string(),
            ack_subject: "fraud.acks".to_string(),
        }
    }
}

impl Default for FeatureStoreConfig {
    fn default() -> Self {
        Self {
            short_window_group: "cc-agg".to_string(),
            long_window_group: "cc-agg-batch".to_string(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: "fraud.endpoint".to_string(),
            fraud_threshold: 0.5,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.transaction_subject, "transactions");
        assert_eq!(config.feature_store.short_window_group, "cc-agg");
        assert_eq!(config.feature_store.long_window_group, "cc-agg-batch");
        assert_eq!(config.scoring.fraud_threshold, 0.5);
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_path("config/does-not-exist.toml").unwrap();
        assert_eq!(config.scoring.endpoint, "fraud.endpoint");
        assert_eq!(config.logging.level, "info");
    }
}
