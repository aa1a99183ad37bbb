//! External-collaborator gateways
//!
//! The feature store and the scoring endpoint are reached through trait
//! seams, constructed once at startup and shared read-only. Tests substitute
//! in-memory fakes.

pub mod feature_store;
pub mod scoring;

pub use feature_store::{FeatureStoreError, FeatureStoreGateway, KvFeatureStore};
pub use scoring::{NatsScoringEndpoint, ScoringError, ScoringGateway};
