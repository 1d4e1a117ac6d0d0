//! Tree-ensemble model artifact
//!
//! Implements the regression ensemble used for work-unit estimates with:
//! - Canonical JSON serialization (sorted keys) and bincode binary form
//! - BLAKE3 model hashing
//! - Structural validation on every load

use super::tree::Tree;
use crate::errors::{PredictorError, Result};
use crate::features::FeatureSchema;
use crate::scorer::Scorer;
use crate::serde_canon::{hash_canonical, hash_canonical_hex, to_canonical_json};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Supported artifact format version
pub const MODEL_VERSION: i32 = 1;

/// Declared type of thresholds and leaf outputs
pub const VALUE_TYPE: &str = "float64";

/// Regression tree ensemble: `score = base_score + sum(tree leaves)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnsembleModel {
    /// Artifact format version (always 1 for now)
    pub version: i32,

    /// Human-readable model name
    #[serde(default)]
    pub name: String,

    /// Declared feature order; tree nodes index into it
    pub feature_names: Vec<String>,

    /// Constant added to every prediction
    #[serde(default)]
    pub base_score: f64,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,
}

impl EnsembleModel {
    pub fn new(name: impl Into<String>, feature_names: Vec<String>, trees: Vec<Tree>) -> Self {
        Self {
            version: MODEL_VERSION,
            name: name.into(),
            feature_names,
            base_score: 0.0,
            trees,
        }
    }

    pub fn with_base_score(mut self, base_score: f64) -> Self {
        self.base_score = base_score;
        self
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(PredictorError::InvalidModel(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        FeatureSchema::new(self.feature_names.iter().cloned())
            .map_err(|e| PredictorError::InvalidModel(e.to_string()))?;

        if self.trees.is_empty() {
            return Err(PredictorError::InvalidModel(
                "Model must have at least one tree".to_string(),
            ));
        }

        if !self.base_score.is_finite() {
            return Err(PredictorError::InvalidModel(format!(
                "Invalid base score: {}",
                self.base_score
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len()).map_err(|e| {
                PredictorError::InvalidModel(format!("Tree {i} validation failed: {e}"))
            })?;
        }

        Ok(())
    }

    /// Feature schema declared by this model
    pub fn schema(&self) -> Result<FeatureSchema> {
        FeatureSchema::new(self.feature_names.iter().cloned())
    }

    /// Raw ensemble output for an already encoded vector
    ///
    /// Malformed trees surface as [`PredictorError::InvalidModel`].
    pub fn predict_raw(&self, features: &[f32]) -> Result<f64> {
        self.trees
            .iter()
            .enumerate()
            .try_fold(self.base_score, |acc, (i, tree)| {
                tree.evaluate(features)
                    .map(|leaf| acc + leaf)
                    .map_err(|e| PredictorError::InvalidModel(format!("Tree {i}: {e}")))
            })
    }

    pub fn num_target(&self) -> i32 {
        1
    }

    pub fn num_feature(&self) -> i32 {
        self.feature_names.len() as i32
    }

    pub fn threshold_type(&self) -> &'static str {
        VALUE_TYPE
    }

    pub fn leaf_output_type(&self) -> &'static str {
        VALUE_TYPE
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.trees.iter().map(|t| t.nodes.len()).sum()
    }

    /// Parse and validate a JSON model
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(to_canonical_json(self)?)
    }

    /// BLAKE3 hash of the canonical JSON representation
    pub fn hash(&self) -> Result<[u8; 32]> {
        Ok(hash_canonical(self)?)
    }

    /// Model hash as hex string
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Load and validate a JSON model file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let model = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            name = %model.name,
            trees = model.num_trees(),
            features = model.feature_names.len(),
            "Loaded ensemble model"
        );
        Ok(model)
    }

    /// Save model to a JSON file with canonical serialization
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_canonical_json()?)?;
        Ok(())
    }

    /// Load and validate a bincode model file
    pub fn load_binary<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        let model: Self = bincode::deserialize(&data)?;
        model.validate()?;
        debug!(path = %path.as_ref().display(), "Loaded binary ensemble model");
        Ok(model)
    }

    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }
}

impl Scorer for EnsembleModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn score(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            return Err(PredictorError::FeatureCountMismatch {
                expected: self.feature_names.len(),
                actual: features.len(),
            });
        }
        self.predict_raw(features)
    }

    fn validate(&self) -> Result<()> {
        EnsembleModel::validate(self)
    }
}
