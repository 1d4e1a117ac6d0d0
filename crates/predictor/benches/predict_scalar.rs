use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::collections::HashMap;
use wu_predictor::gbdt::{Node, Tree};
use wu_predictor::{EnsembleModel, FeatureMap, PredictorConfig, PredictorKind, WorkUnitPredictor};

fn sample_model() -> EnsembleModel {
    // Two shallow trees over the cpufj features; enough to exercise routing.
    let trees = vec![
        Tree::new(vec![
            Node::internal(0, 1, 7200.0, 1, 2),
            Node::leaf(1, 160.0),
            Node::leaf(2, 230.0),
        ]),
        Tree::new(vec![
            Node::internal(0, 3, 6.0, 1, 2),
            Node::leaf(1, -1.0),
            Node::internal(2, 2, 250_000.0, 3, 4),
            Node::leaf(3, 0.2),
            Node::leaf(4, -0.2),
        ]),
    ];
    let names = PredictorKind::CpuFj
        .feature_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    EnsembleModel::new("cpufj", names, trees)
}

fn sample_features(n_vars: f32) -> FeatureMap {
    HashMap::from([
        ("n_vars".to_string(), n_vars),
        ("n_cstrs".to_string(), 5_000.0),
        ("total_nnz".to_string(), 120_000.0),
    ])
}

fn bench_cached_prediction(c: &mut Criterion) {
    let predictor =
        WorkUnitPredictor::from_model(sample_model(), PredictorConfig::default()).unwrap();
    let features = sample_features(1_000.0);
    predictor.predict_scalar(&features).unwrap();

    c.bench_function("predict_scalar_cache_hit", |b| {
        b.iter(|| black_box(predictor.predict_scalar(black_box(&features)).unwrap()));
    });
}

fn bench_uncached_prediction(c: &mut Criterion) {
    let mut config = PredictorConfig::default();
    config.cache.enabled = false;
    let predictor = WorkUnitPredictor::from_model(sample_model(), config).unwrap();
    let features = sample_features(1_000.0);

    c.bench_function("predict_scalar_uncached", |b| {
        b.iter(|| black_box(predictor.predict_scalar(black_box(&features)).unwrap()));
    });
}

fn bench_cache_fill(c: &mut Criterion) {
    let inputs: Vec<FeatureMap> = (0..256).map(|i| sample_features(i as f32)).collect();

    c.bench_function("predict_scalar_fill_256", |b| {
        b.iter_batched(
            || WorkUnitPredictor::from_model(sample_model(), PredictorConfig::default()).unwrap(),
            |predictor| {
                for input in &inputs {
                    black_box(predictor.predict_scalar(input).unwrap());
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    predictor_benches,
    bench_cached_prediction,
    bench_uncached_prediction,
    bench_cache_fill
);
criterion_main!(predictor_benches);
