//! Convergence tests for the DNN estimators on the canned datasets.
//!
//! Each test seeds its estimator deterministically, trains for a fixed step
//! budget, and asserts a quality threshold on the training data plus the
//! expected learned-parameter shapes.

use tabular_dnn::{
    accuracy_score, load_housing, load_iris, mean_squared_error, DnnClassifier, DnnRegressor,
    FeatureColumn, RunConfig,
};

const SEED: u64 = 42;

fn iris_classifier(dropout: f64) -> DnnClassifier {
    DnnClassifier::new(
        &[FeatureColumn::real_valued("", 4)],
        &[10, 20, 10],
        3,
        RunConfig::with_seed(SEED),
    )
    .expect("valid classifier config")
    .dropout(dropout)
}

#[test]
fn iris_dnn() {
    let iris = load_iris().unwrap();
    let mut classifier = DnnClassifier::new(
        &[FeatureColumn::real_valued("", 4)],
        &[10, 20, 10],
        3,
        RunConfig::with_seed(SEED),
    )
    .unwrap();
    classifier.fit(&iris.data, &iris.target, 200).unwrap();
    let predictions = classifier.predict(&iris.data).unwrap();
    let score = accuracy_score(&iris.target, &predictions);
    assert!(score > 0.9, "Failed with score = {}", score);

    let weights = classifier.weights();
    assert_eq!(weights[0].dim(), (4, 10));
    assert_eq!(weights[1].dim(), (10, 20));
    assert_eq!(weights[2].dim(), (20, 10));
    assert_eq!(weights[3].dim(), (10, 3));
    let biases = classifier.biases();
    assert_eq!(biases.len(), 5);
}

#[test]
fn housing_dnn() {
    let housing = load_housing();
    let mut regressor = DnnRegressor::new(
        &[FeatureColumn::real_valued("", 13)],
        &[10, 20, 10],
        RunConfig::with_seed(SEED),
    )
    .unwrap()
    .batch_size(housing.data.nrows());
    regressor.fit(&housing.data, &housing.target, 300).unwrap();
    let predictions = regressor.predict(&housing.data).unwrap();
    let score = mean_squared_error(&housing.target, &predictions);
    assert!(score < 110.0, "Failed with score = {}", score);

    let weights = regressor.weights();
    assert_eq!(weights[0].dim(), (13, 10));
    assert_eq!(weights[1].dim(), (10, 20));
    assert_eq!(weights[2].dim(), (20, 10));
    assert_eq!(weights[3].dim(), (10, 1));
    let biases = regressor.biases();
    assert_eq!(biases.len(), 5);
}

#[test]
fn dnn_dropout_0() {
    // Dropout prob == 0.
    let iris = load_iris().unwrap();
    let mut classifier = iris_classifier(0.0);
    classifier.fit(&iris.data, &iris.target, 200).unwrap();
    let predictions = classifier.predict(&iris.data).unwrap();
    let score = accuracy_score(&iris.target, &predictions);
    assert!(score > 0.9, "Failed with score = {}", score);
}

#[test]
fn dnn_dropout_0_1() {
    // Dropping only a little.
    let iris = load_iris().unwrap();
    let mut classifier = iris_classifier(0.1);
    classifier.fit(&iris.data, &iris.target, 200).unwrap();
    let predictions = classifier.predict(&iris.data).unwrap();
    let score = accuracy_score(&iris.target, &predictions);
    // If the quality is lower - dropout is not working.
    assert!(score > 0.9, "Failed with score = {}", score);
}

#[test]
fn dnn_dropout_0_9() {
    // Dropping out most of it.
    let iris = load_iris().unwrap();
    let mut classifier = iris_classifier(0.9);
    classifier.fit(&iris.data, &iris.target, 200).unwrap();
    let predictions = classifier.predict(&iris.data).unwrap();
    let score = accuracy_score(&iris.target, &predictions);
    assert!(score > 0.3, "Failed with score = {}", score);
    // If the quality is higher - dropout is not working.
    assert!(score < 0.6, "Failed with score = {}", score);
}

#[test]
fn fixed_seed_runs_are_deterministic() {
    let iris = load_iris().unwrap();
    let run = || {
        let mut classifier = iris_classifier(0.1);
        classifier.fit(&iris.data, &iris.target, 50).unwrap();
        let predictions = classifier.predict(&iris.data).unwrap();
        accuracy_score(&iris.target, &predictions)
    };
    let first = run();
    let second = run();
    assert_eq!(first, second, "{} vs {}", first, second);
}

#[test]
fn bias_count_tracks_hidden_layer_count() {
    // L hidden layers yield L + 1 weight matrices and L + 2 bias vectors
    // (per-layer biases plus the centered bias).
    for hidden in [vec![8], vec![6, 4], vec![10, 20, 10], vec![5, 4, 3, 2]] {
        let classifier = DnnClassifier::new(
            &[FeatureColumn::real_valued("", 4)],
            &hidden,
            3,
            RunConfig::with_seed(SEED),
        )
        .unwrap();
        assert_eq!(classifier.weights().len(), hidden.len() + 1);
        assert_eq!(classifier.biases().len(), hidden.len() + 2);

        let widths: Vec<usize> = hidden.iter().copied().chain([3]).collect();
        let mut prev = 4;
        for (w, &width) in classifier.weights().iter().zip(&widths) {
            assert_eq!(w.dim(), (prev, width));
            prev = width;
        }
    }
}
