// ml_demo/src/main.rs
use anyhow::Result;
use tabular_dnn::{
    accuracy_score, load_housing, load_iris, mean_squared_error, DnnClassifier, DnnRegressor,
    FeatureColumn, RunConfig,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Iris Dataset ===");
    let iris = load_iris()?;
    println!("Loaded {} samples", iris.len());
    let mut classifier = DnnClassifier::new(
        &[FeatureColumn::real_valued("measurements", 4)],
        &[10, 20, 10],
        3,
        RunConfig::with_seed(42),
    )?;
    println!("Model: {}", classifier);
    classifier.fit(&iris.data, &iris.target, 200)?;
    let accuracy = accuracy_score(&iris.target, &classifier.predict(&iris.data)?);
    println!("Iris Accuracy: {:.2}%", accuracy * 100.0);

    // Demo: save and load model
    classifier.save("models/iris_model.gz")?;
    let reloaded = DnnClassifier::load("models/iris_model.gz")?;
    let accuracy_loaded = accuracy_score(&iris.target, &reloaded.predict(&iris.data)?);
    println!("Iris Accuracy (reloaded): {:.2}%", accuracy_loaded * 100.0);

    println!("\n=== Housing Dataset ===");
    let housing = load_housing();
    let mut regressor = DnnRegressor::new(
        &[FeatureColumn::real_valued("attributes", 13)],
        &[10, 20, 10],
        RunConfig::with_seed(42),
    )?
    .batch_size(housing.data.nrows());
    println!("Model: {}", regressor);
    regressor.fit(&housing.data, &housing.target, 300)?;
    let mse = mean_squared_error(&housing.target, &regressor.predict(&housing.data)?);
    println!("Housing MSE: {:.2}", mse);

    Ok(())
}
