//! Work-unit prediction for solver heuristics
//!
//! Estimates how much work a solver component will need for a problem
//! instance from a handful of named measurements, using a pretrained
//! gradient-boosted tree ensemble, and memoizes the estimate per input.
//!
//! Modules:
//! - `features`: Named feature mapping → fixed-order vector (NaN for missing)
//! - `hashing`: FNV-1a fingerprints used as cache keys
//! - `cache`: Fingerprint → prediction memoization
//! - `gbdt`: Data-driven tree-ensemble interpreter and model artifacts
//! - `scorer`: The trait the predictor scores through
//! - `predictor`: Encoder + cache + scorer facade
//! - `models`: Feature schemas of the built-in estimators
//! - `scheduler` / `work_limit`: Deterministic work-unit synchronisation
//! - `config`: TOML configuration with environment overrides

pub mod cache;
pub mod config;
pub mod errors;
pub mod features;
pub mod gbdt;
pub mod hashing;
pub mod models;
pub mod predictor;
pub mod scheduler;
pub mod scorer;
pub mod serde_canon;
pub mod work_limit;

pub use cache::{CacheStats, Lookup, PredictionCache};
pub use config::{CacheConfig, LoggingConfig, PredictorConfig};
pub use errors::{PredictorError, Result};
pub use features::{EncodedFeatures, FeatureMap, FeatureSchema, FeatureSource, MISSING};
pub use gbdt::{EnsembleModel, Node, Tree};
pub use hashing::{compute_hash, compute_scalar_hash, fnv1a_32};
pub use models::PredictorKind;
pub use predictor::WorkUnitPredictor;
pub use scheduler::WorkUnitScheduler;
pub use scorer::Scorer;
pub use work_limit::WorkLimitContext;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
