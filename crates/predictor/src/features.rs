//! Feature encoding for the work-unit predictor
//!
//! A named feature mapping is projected onto the model's declared feature
//! order. Absent features are encoded as a quiet NaN, which the tree walker
//! routes down the "greater" branch and which hashes like any other value.

use crate::errors::{PredictorError, Result};
use crate::hashing::compute_hash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasher;
use std::ops::Deref;
use tracing::trace;

/// Named problem-instance measurements supplied by the caller
pub type FeatureMap = HashMap<String, f32>;

/// Sentinel used for features the caller did not supply
pub const MISSING: f32 = f32::NAN;

/// Anything that can answer "what is the value of feature `name`?"
pub trait FeatureSource {
    fn feature(&self, name: &str) -> Option<f32>;
}

impl<S: BuildHasher> FeatureSource for HashMap<String, f32, S> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied()
    }
}

impl<S: BuildHasher> FeatureSource for HashMap<&str, f32, S> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied()
    }
}

impl FeatureSource for BTreeMap<String, f32> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied()
    }
}

impl FeatureSource for [(&str, f32)] {
    fn feature(&self, name: &str) -> Option<f32> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

/// Ordered list of feature names a model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema; names must be non-empty and unique
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(PredictorError::InvalidSchema(format!(
                    "feature {i} has an empty name"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(PredictorError::InvalidSchema(format!(
                    "duplicate feature name '{name}'"
                )));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `name` in the encoded vector
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Project `features` onto this schema's order
    ///
    /// Never fails: a feature that is not present becomes [`MISSING`].
    /// Keys in `features` that the schema does not declare are ignored.
    pub fn encode<F: FeatureSource + ?Sized>(&self, features: &F) -> EncodedFeatures {
        let values = self
            .names
            .iter()
            .map(|name| match features.feature(name) {
                Some(value) => {
                    trace!(feature = %name, value, "feature resolved");
                    value
                }
                None => {
                    trace!(feature = %name, "feature missing");
                    MISSING
                }
            })
            .collect();
        EncodedFeatures(values)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = PredictorError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

/// Fixed-order feature vector, one slot per schema entry
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures(Vec<f32>);

impl EncodedFeatures {
    pub fn from_values(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// FNV-1a fingerprint of the raw native-endian bytes
    pub fn fingerprint(&self) -> u32 {
        compute_hash(&self.0)
    }

    pub fn is_missing(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|v| v.is_nan())
    }

    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_nan()).count()
    }

    /// Bitwise equality, so two NaN sentinels compare equal
    pub fn same_bits(&self, other: &[f32]) -> bool {
        self.0.len() == other.len()
            && self
                .0
                .iter()
                .zip(other)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for EncodedFeatures {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}
