//! Error types for the work-unit predictor

use thiserror::Error;

/// Errors that can occur while building or querying a predictor
#[derive(Error, Debug)]
pub enum PredictorError {
    /// Encoder schema and scorer disagree on feature count or order
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Encoded vector length does not match the scorer
    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// Model artifact failed structural validation
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Feature schema is malformed
    #[error("Invalid feature schema: {0}")]
    InvalidSchema(String),

    /// Scorer invocation failed
    #[error("Scorer failed: {0}")]
    Scorer(String),

    /// Configuration value rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary model (de)serialization error
    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for PredictorError {
    fn from(err: toml::de::Error) -> Self {
        PredictorError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for PredictorError {
    fn from(err: toml::ser::Error) -> Self {
        PredictorError::Toml(err.to_string())
    }
}

/// Result type for predictor operations
pub type Result<T> = std::result::Result<T, PredictorError>;
