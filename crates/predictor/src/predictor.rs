//! Work-unit predictor: encode → fingerprint → cache → score

use crate::cache::{CacheMetrics, CacheStats, Lookup, PredictionCache};
use crate::config::PredictorConfig;
use crate::errors::{PredictorError, Result};
use crate::features::{EncodedFeatures, FeatureSchema, FeatureSource};
use crate::gbdt::EnsembleModel;
use crate::scorer::Scorer;
use parking_lot::Mutex;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Memoizing front end over a [`Scorer`]
///
/// Identical feature mappings map to the same fingerprint, so only the first
/// query for a given input reaches the scorer. The returned estimate is the
/// absolute value of the raw score.
#[derive(Debug)]
pub struct WorkUnitPredictor<S> {
    schema: FeatureSchema,
    scorer: S,
    cache: Mutex<PredictionCache>,
    metrics: CacheMetrics,
    config: PredictorConfig,
}

impl<S: Scorer> WorkUnitPredictor<S> {
    /// Bind `schema` to `scorer`; their feature lists must agree exactly
    pub fn new(schema: FeatureSchema, scorer: S, config: PredictorConfig) -> Result<Self> {
        for warning in config.validate()? {
            warn!("{warning}");
        }

        if schema.len() != scorer.feature_count() {
            return Err(PredictorError::SchemaMismatch(format!(
                "encoder declares {} features, scorer expects {}",
                schema.len(),
                scorer.feature_count()
            )));
        }
        if let Some((i, (ours, theirs))) = schema
            .names()
            .iter()
            .zip(scorer.feature_names())
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            return Err(PredictorError::SchemaMismatch(format!(
                "feature {i} is '{ours}' in the encoder but '{theirs}' in the scorer"
            )));
        }
        scorer.validate()?;

        Ok(Self {
            cache: Mutex::new(PredictionCache::new(&config.cache)),
            metrics: CacheMetrics::default(),
            schema,
            scorer,
            config,
        })
    }

    /// Estimated work for `features`, memoized by fingerprint
    ///
    /// Missing features are encoded as NaN and are not an error. Scorer
    /// failures propagate unchanged and leave the cache untouched.
    pub fn predict_scalar<F: FeatureSource + ?Sized>(&self, features: &F) -> Result<f32> {
        let encoded = self.encode(features);
        let fingerprint = encoded.fingerprint();

        if self.config.logging.log_features {
            for (name, value) in self.schema.names().iter().zip(encoded.iter()) {
                if value.is_nan() {
                    debug!("Feature {name}: missing");
                } else {
                    debug!("Feature {name}: {value}");
                }
            }
        }

        if !self.config.cache.enabled {
            return self.score_abs(&encoded);
        }

        // Held across score + insert so one fingerprint is never scored twice.
        let mut cache = self.cache.lock();
        match cache.lookup(fingerprint, &encoded) {
            Lookup::Hit(value) => {
                CacheMetrics::record(&self.metrics.hits);
                return Ok(value);
            }
            Lookup::Miss => CacheMetrics::record(&self.metrics.misses),
            Lookup::Collision => {
                CacheMetrics::record(&self.metrics.misses);
                CacheMetrics::record(&self.metrics.collisions);
                warn!("Fingerprint collision on {fingerprint:#010x}, rescoring");
            }
        }

        let value = self.score_abs(&encoded)?;
        if let Some(evicted) = cache.insert(fingerprint, &encoded, value) {
            CacheMetrics::record(&self.metrics.evictions);
            debug!("Evicted least recently used prediction {evicted:#010x}");
        }
        Ok(value)
    }

    fn score_abs(&self, encoded: &EncodedFeatures) -> Result<f32> {
        CacheMetrics::record(&self.metrics.scorer_calls);
        let start = Instant::now();
        let raw = self.scorer.score(encoded)?;
        let elapsed = start.elapsed();
        debug!("Prediction time: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
        debug!("Result: {raw}");
        Ok(raw.abs() as f32)
    }

    /// Encode `features` in this predictor's order
    pub fn encode<F: FeatureSource + ?Sized>(&self, features: &F) -> EncodedFeatures {
        self.schema.encode(features)
    }

    /// Cache key that `features` would use
    pub fn fingerprint<F: FeatureSource + ?Sized>(&self, features: &F) -> u32 {
        self.encode(features).fingerprint()
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.cache.lock().len())
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }
}

impl WorkUnitPredictor<EnsembleModel> {
    /// Predictor whose schema is the model's own feature list
    pub fn from_model(model: EnsembleModel, config: PredictorConfig) -> Result<Self> {
        model.validate()?;
        let schema = model.schema()?;
        Self::new(schema, model, config)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_model_file<P: AsRef<Path>>(path: P, config: PredictorConfig) -> Result<Self> {
        let model = EnsembleModel::load_json(path)?;
        Self::from_model(model, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::features::FeatureMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FixedScorer {
        names: Vec<String>,
        output: f64,
        calls: AtomicUsize,
    }

    impl FixedScorer {
        fn new(names: &[&str], output: f64) -> Self {
            Self {
                names: names.iter().map(|s| s.to_string()).collect(),
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Scorer for FixedScorer {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn score(&self, _features: &[f32]) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output)
        }
    }

    fn features(pairs: &[(&str, f32)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_schema_count_mismatch_rejected() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let err = WorkUnitPredictor::new(
            schema,
            FixedScorer::new(&["a"], 1.0),
            PredictorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PredictorError::SchemaMismatch(_)));
    }

    #[test]
    fn test_schema_order_mismatch_rejected() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let err = WorkUnitPredictor::new(
            schema,
            FixedScorer::new(&["b", "a"], 1.0),
            PredictorConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("feature 0"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PredictorConfig::default();
        config.cache.max_entries = Some(0);
        let schema = FeatureSchema::new(["a"]).unwrap();
        assert!(WorkUnitPredictor::new(schema, FixedScorer::new(&["a"], 1.0), config).is_err());
    }

    #[test]
    fn test_disabled_cache_always_scores() {
        let config = PredictorConfig {
            cache: CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
            ..PredictorConfig::default()
        };
        let schema = FeatureSchema::new(["a"]).unwrap();
        let predictor =
            WorkUnitPredictor::new(schema, FixedScorer::new(&["a"], -2.0), config).unwrap();

        let input = features(&[("a", 1.0)]);
        assert_eq!(predictor.predict_scalar(&input).unwrap(), 2.0);
        assert_eq!(predictor.predict_scalar(&input).unwrap(), 2.0);
        assert_eq!(predictor.scorer().calls.load(Ordering::SeqCst), 2);
        assert_eq!(predictor.stats().entries, 0);
    }

    #[test]
    fn test_stats_and_clear() {
        let schema = FeatureSchema::new(["a"]).unwrap();
        let predictor = WorkUnitPredictor::new(
            schema,
            FixedScorer::new(&["a"], 4.0),
            PredictorConfig::default(),
        )
        .unwrap();

        let input = features(&[("a", 1.0)]);
        predictor.predict_scalar(&input).unwrap();
        predictor.predict_scalar(&input).unwrap();
        predictor.predict_scalar(&input).unwrap();

        let stats = predictor.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.scorer_calls, 1);
        assert_eq!(stats.entries, 1);

        predictor.clear_cache();
        assert_eq!(predictor.stats().entries, 0);
        predictor.predict_scalar(&input).unwrap();
        assert_eq!(predictor.scorer().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_log_features_does_not_change_result() {
        let mut config = PredictorConfig::default();
        config.logging.log_features = true;
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let predictor =
            WorkUnitPredictor::new(schema, FixedScorer::new(&["a", "b"], -7.5), config).unwrap();
        assert_eq!(predictor.predict_scalar(&features(&[("a", 1.0)])).unwrap(), 7.5);
    }

    fn seeded_collision(verify_keys: bool) -> (WorkUnitPredictor<FixedScorer>, FeatureMap) {
        let mut config = PredictorConfig::default();
        config.cache.verify_keys = verify_keys;
        let schema = FeatureSchema::new(["a"]).unwrap();
        let predictor =
            WorkUnitPredictor::new(schema, FixedScorer::new(&["a"], -7.5), config).unwrap();

        // store a different vector under the fingerprint the input will use
        let input = features(&[("a", 2.0)]);
        let fingerprint = predictor.fingerprint(&input);
        predictor.cache.lock().insert(fingerprint, &[99.0], 1.0);
        (predictor, input)
    }

    #[test]
    fn test_verified_collision_is_rescored() {
        let (predictor, input) = seeded_collision(true);

        assert_eq!(predictor.predict_scalar(&input).unwrap(), 7.5);
        let stats = predictor.stats();
        assert_eq!(stats.collisions, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(predictor.scorer().calls.load(Ordering::SeqCst), 1);

        // the replaced entry now belongs to this input
        assert_eq!(predictor.predict_scalar(&input).unwrap(), 7.5);
        assert_eq!(predictor.stats().hits, 1);
        assert_eq!(predictor.scorer().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unverified_collision_serves_stored_value() {
        let (predictor, input) = seeded_collision(false);

        assert_eq!(predictor.predict_scalar(&input).unwrap(), 1.0);
        assert_eq!(predictor.stats().collisions, 0);
        assert_eq!(predictor.scorer().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_malformed_model_rejected_at_construction() {
        use crate::gbdt::{Node, Tree};

        let looping = EnsembleModel::new(
            "looping",
            vec!["a".to_string()],
            vec![Tree::new(vec![Node::internal(0, 0, 1.0, 0, 0)])],
        );
        let schema = FeatureSchema::new(["a"]).unwrap();
        let err = WorkUnitPredictor::new(schema, looping, PredictorConfig::default()).unwrap_err();
        assert!(matches!(err, PredictorError::InvalidModel(_)));

        let wide = EnsembleModel::new(
            "wide",
            vec!["a".to_string()],
            vec![Tree::new(vec![
                Node::internal(0, 7, 1.0, 1, 2),
                Node::leaf(1, 1.0),
                Node::leaf(2, 2.0),
            ])],
        );
        let schema = FeatureSchema::new(["a"]).unwrap();
        assert!(WorkUnitPredictor::new(schema, wide, PredictorConfig::default()).is_err());
    }
}
