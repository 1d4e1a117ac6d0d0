//! Scorer seam between the encoder/cache and the model

use crate::errors::Result;
use std::sync::Arc;

/// A pure function from an encoded feature vector to a raw regression output.
///
/// The raw output may be negative; the predictor clamps it with `abs()`.
/// Errors are propagated to the caller untouched and never cached.
pub trait Scorer {
    /// Declared feature order; must match the predictor's schema exactly
    fn feature_names(&self) -> &[String];

    fn feature_count(&self) -> usize {
        self.feature_names().len()
    }

    fn score(&self, features: &[f32]) -> Result<f64>;

    /// Structural self-check run once when a predictor is built
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl<S: Scorer + ?Sized> Scorer for Arc<S> {
    fn feature_names(&self) -> &[String] {
        (**self).feature_names()
    }

    fn feature_count(&self) -> usize {
        (**self).feature_count()
    }

    fn score(&self, features: &[f32]) -> Result<f64> {
        (**self).score(features)
    }

    fn validate(&self) -> Result<()> {
        (**self).validate()
    }
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn feature_names(&self) -> &[String] {
        (**self).feature_names()
    }

    fn feature_count(&self) -> usize {
        (**self).feature_count()
    }

    fn score(&self, features: &[f32]) -> Result<f64> {
        (**self).score(features)
    }

    fn validate(&self) -> Result<()> {
        (**self).validate()
    }
}
