//! Deep neural network estimators for tabular data: a classifier and a
//! regressor with a fit/predict lifecycle, canned datasets, and sklearn-style
//! metric helpers.
//!
//! - `DnnClassifier` / `DnnRegressor` built from dense ReLU layers with an
//!   Adam training loop, optional dropout, and a deterministic-seed
//!   `RunConfig`
//! - Iris and housing dataset loaders
//! - `accuracy_score` / `mean_squared_error` metrics
//! - Gzipped-JSON model persistence

pub mod activations;
pub mod datasets;
pub mod estimator;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod optim;

pub use activations::{Activation, ActivationKind, Linear, ReLU, Sigmoid, Softmax, Tanh};
pub use datasets::{load_housing, load_iris, Dataset};
pub use estimator::{DnnClassifier, DnnRegressor, FeatureColumn, RunConfig};
pub use layers::DenseLayer;
pub use loss::{mse_deriv, mse_loss, softmax_cross_entropy, softmax_cross_entropy_deriv};
pub use metrics::{accuracy_score, confusion_matrix, mean_squared_error};
pub use optim::{Adam, Moments};
