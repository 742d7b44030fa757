//! DNN classifier and regressor estimators with a fit/predict lifecycle and
//! gzipped-JSON persistence.
use crate::activations::{
    argmax, identify_activation_kind, Activation, ActivationKind, Linear, ReLU, Softmax,
};
use crate::layers::DenseLayer;
use crate::loss;
use crate::optim::{Adam, Moments};
use anyhow::{anyhow, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array1, Array2, Axis, Ix1, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

const DEFAULT_LEARNING_RATE: f64 = 0.1;
const DEFAULT_BATCH_SIZE: usize = 32;
const LOG_EVERY: u64 = 50;

/// Descriptor of a real-valued input feature group.
#[derive(Debug, Clone)]
pub struct FeatureColumn {
    name: String,
    dimension: usize,
}

impl FeatureColumn {
    pub fn real_valued(name: &str, dimension: usize) -> Self {
        Self {
            name: name.to_string(),
            dimension,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Run configuration controlling estimator-level randomness.
///
/// With `random_seed` set, weight initialization and dropout masking are fully
/// deterministic, so repeated fit/predict runs of the same scenario produce
/// identical metrics.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub random_seed: Option<u64>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            random_seed: Some(seed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Task {
    Classification,
    Regression,
}

/// Batch activations cached during a training forward pass.
struct ForwardCache {
    /// `acts[0]` is the input batch; `acts[i+1]` is hidden layer `i`'s output
    /// after activation and dropout.
    acts: Vec<Array2<f64>>,
    /// Pre-activations per hidden layer.
    zs: Vec<Array2<f64>>,
    /// Inverted-scale dropout masks per hidden layer, when dropout is active.
    masks: Vec<Option<Array2<f64>>>,
    logits: Array2<f64>,
}

/// Shared internals of the classifier and regressor.
///
/// `layers` holds the hidden layers followed by a linear output layer. The
/// `centered_bias` vector is added to the final logits and trained along with
/// the layers; it is initialized from the targets on first fit (log class
/// priors / target mean) so the layers learn residual structure.
///
/// Input features are standardized to zero mean and unit variance. The
/// statistics are frozen at the first fit and applied to every later fit and
/// predict call.
struct DnnModel {
    layers: Vec<DenseLayer>,
    centered_bias: Array1<f64>,
    input_dim: usize,
    output_dim: usize,
    hidden_count: usize,
    task: Task,
    dropout: f64,
    batch_size: usize,
    adam: Adam,
    weight_moments: Vec<Moments<Ix2>>,
    bias_moments: Vec<Moments<Ix1>>,
    cb_moments: Moments<Ix1>,
    rng: StdRng,
    cursor: usize,
    feature_means: Option<Array1<f64>>,
    feature_stds: Option<Array1<f64>>,
}

impl DnnModel {
    fn new(
        feature_columns: &[FeatureColumn],
        hidden_units: &[usize],
        output_dim: usize,
        task: Task,
        config: RunConfig,
    ) -> Result<Self> {
        let input_dim: usize = feature_columns.iter().map(FeatureColumn::dimension).sum();
        if input_dim == 0 {
            return Err(anyhow!(
                "Feature columns must describe at least one input dimension"
            ));
        }
        if hidden_units.iter().any(|&h| h == 0) {
            return Err(anyhow!("Hidden layer widths must be positive"));
        }
        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hidden_activation: Arc<dyn Activation + Send + Sync> = Arc::new(ReLU);
        let mut layers = Vec::with_capacity(hidden_units.len() + 1);
        let mut prev = input_dim;
        for &width in hidden_units {
            layers.push(DenseLayer::new(prev, width, hidden_activation.clone(), &mut rng));
            prev = width;
        }
        // Output layer is linear; the classifier applies softmax on top
        layers.push(DenseLayer::new(prev, output_dim, Arc::new(Linear), &mut rng));

        let weight_moments = layers.iter().map(|l| Moments::zeros_like(&l.weights)).collect();
        let bias_moments = layers.iter().map(|l| Moments::zeros_like(&l.bias)).collect();
        let centered_bias = Array1::zeros(output_dim);
        let cb_moments = Moments::zeros_like(&centered_bias);
        Ok(Self {
            layers,
            centered_bias,
            input_dim,
            output_dim,
            hidden_count: hidden_units.len(),
            task,
            dropout: 0.0,
            batch_size: DEFAULT_BATCH_SIZE,
            adam: Adam::default_params(DEFAULT_LEARNING_RATE),
            weight_moments,
            bias_moments,
            cb_moments,
            rng,
            cursor: 0,
            feature_means: None,
            feature_stds: None,
        })
    }

    fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        match (&self.feature_means, &self.feature_stds) {
            (Some(means), Some(stds)) => (x - means) / stds,
            _ => x.clone(),
        }
    }

    fn set_hidden_activation(&mut self, kind: &ActivationKind) {
        for layer in self.layers.iter_mut().take(self.hidden_count) {
            layer.activation = kind.to_arc();
        }
    }

    fn init_centered_bias(&mut self, y: &Array1<f64>) {
        match self.task {
            Task::Regression => {
                let mean = y.sum() / y.len() as f64;
                self.centered_bias.fill(mean);
            }
            Task::Classification => {
                let mut counts = vec![0usize; self.output_dim];
                for &label in y {
                    counts[label as usize] += 1;
                }
                let n = y.len() as f64;
                for (b, &count) in self.centered_bias.iter_mut().zip(&counts) {
                    *b = ((count as f64).max(1.0) / n).ln();
                }
            }
        }
    }

    fn next_batch(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        batch: usize,
    ) -> (Array2<f64>, Array1<f64>) {
        let n = x.nrows();
        if batch >= n {
            return (x.clone(), y.clone());
        }
        // Deterministic sequential batching with wraparound
        let idx: Vec<usize> = (0..batch).map(|k| (self.cursor + k) % n).collect();
        self.cursor = (self.cursor + batch) % n;
        (x.select(Axis(0), &idx), y.select(Axis(0), &idx))
    }

    fn forward_train(&mut self, x: &Array2<f64>) -> ForwardCache {
        let keep = 1.0 - self.dropout;
        let mut acts = Vec::with_capacity(self.hidden_count + 1);
        let mut zs = Vec::with_capacity(self.hidden_count);
        let mut masks = Vec::with_capacity(self.hidden_count);
        acts.push(x.clone());
        for i in 0..self.hidden_count {
            let (z, mut a) = self.layers[i].forward(acts.last().expect("input activation present"));
            // Inverted dropout on hidden activations only; prediction never masks
            let mask = if self.dropout > 0.0 {
                let rng = &mut self.rng;
                let m = Array2::from_shape_fn(a.raw_dim(), |_| {
                    if rng.gen::<f64>() < keep {
                        1.0 / keep
                    } else {
                        0.0
                    }
                });
                a = &a * &m;
                Some(m)
            } else {
                None
            };
            zs.push(z);
            masks.push(mask);
            acts.push(a);
        }
        let (_, out) = self.layers[self.hidden_count]
            .forward(acts.last().expect("input activation present"));
        let logits = out + &self.centered_bias;
        ForwardCache {
            acts,
            zs,
            masks,
            logits,
        }
    }

    fn forward_eval(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut current = x.clone();
        for layer in &self.layers {
            let (_, a) = layer.forward(&current);
            current = a;
        }
        current + &self.centered_bias
    }

    /// Backpropagate `dlogits` through the cached forward pass and apply one
    /// Adam step to every parameter tensor.
    fn backward(&mut self, cache: &ForwardCache, dlogits: Array2<f64>) {
        let out_idx = self.hidden_count;
        let dcb = dlogits.sum_axis(Axis(0));

        let mut dw_rev = Vec::with_capacity(self.layers.len());
        let mut db_rev = Vec::with_capacity(self.layers.len());
        dw_rev.push(cache.acts[out_idx].t().dot(&dlogits));
        db_rev.push(dcb.clone());
        let mut delta = dlogits.dot(&self.layers[out_idx].weights.t());

        for i in (0..self.hidden_count).rev() {
            let mut da = delta;
            if let Some(mask) = &cache.masks[i] {
                da = &da * mask;
            }
            let act = self.layers[i].activation.clone();
            let dz = &da * &cache.zs[i].mapv(|v| act.derivative(v));
            dw_rev.push(cache.acts[i].t().dot(&dz));
            db_rev.push(dz.sum_axis(Axis(0)));
            delta = dz.dot(&self.layers[i].weights.t());
        }
        dw_rev.reverse();
        db_rev.reverse();

        self.adam.begin_step();
        for (i, (dw, db)) in dw_rev.iter().zip(&db_rev).enumerate() {
            self.adam
                .update(&mut self.layers[i].weights, dw, &mut self.weight_moments[i]);
            self.adam
                .update(&mut self.layers[i].bias, db, &mut self.bias_moments[i]);
        }
        self.adam
            .update(&mut self.centered_bias, &dcb, &mut self.cb_moments);
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, steps: usize) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(anyhow!("Dataset is empty"));
        }
        if x.ncols() != self.input_dim {
            return Err(anyhow!(
                "Expected {} input features, got {}",
                self.input_dim,
                x.ncols()
            ));
        }
        if y.len() != n {
            return Err(anyhow!(
                "Feature rows and targets differ in length: {} vs {}",
                n,
                y.len()
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(anyhow!(
                "Dropout rate must lie in [0, 1), got {}",
                self.dropout
            ));
        }
        if self.task == Task::Classification {
            for &label in y {
                if label.fract() != 0.0 || label < 0.0 || label as usize >= self.output_dim {
                    return Err(anyhow!(
                        "Class label {} out of range for {} classes",
                        label,
                        self.output_dim
                    ));
                }
            }
        }
        if self.adam.step_count() == 0 {
            let means = x.mean_axis(Axis(0)).ok_or_else(|| anyhow!("Dataset is empty"))?;
            let stds = x
                .std_axis(Axis(0), 0.0)
                .mapv(|s| if s > 1e-12 { s } else { 1.0 });
            self.feature_means = Some(means);
            self.feature_stds = Some(stds);
            self.init_centered_bias(y);
        }
        tracing::info!(steps, samples = n, "fitting estimator");

        let x = self.standardize(x);
        let batch = self.batch_size.clamp(1, n);
        for _ in 0..steps {
            let (xb, yb) = self.next_batch(&x, y, batch);
            let cache = self.forward_train(&xb);
            let dlogits = match self.task {
                Task::Classification => loss::softmax_cross_entropy_deriv(&cache.logits, &yb),
                Task::Regression => {
                    let preds = cache.logits.column(0).to_owned();
                    loss::mse_deriv(&preds, &yb).insert_axis(Axis(1))
                }
            };
            self.backward(&cache, dlogits);
            let step = self.adam.step_count();
            if step % LOG_EVERY == 0 {
                let step_loss = match self.task {
                    Task::Classification => loss::softmax_cross_entropy(&cache.logits, &yb)?,
                    Task::Regression => {
                        loss::mse_loss(&cache.logits.column(0).to_owned(), &yb)
                    }
                };
                tracing::debug!(step, loss = step_loss, "training step");
            }
        }
        Ok(())
    }

    fn predict_logits(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.input_dim {
            return Err(anyhow!(
                "Expected {} input features, got {}",
                self.input_dim,
                x.ncols()
            ));
        }
        Ok(self.forward_eval(&self.standardize(x)))
    }

    fn weights(&self) -> Vec<&Array2<f64>> {
        self.layers.iter().map(|l| &l.weights).collect()
    }

    /// Per-layer biases in order, with the centered bias last.
    fn biases(&self) -> Vec<&Array1<f64>> {
        let mut biases: Vec<&Array1<f64>> = self.layers.iter().map(|l| &l.bias).collect();
        biases.push(&self.centered_bias);
        biases
    }

    fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.input_dim];
        sizes.extend(self.layers.iter().map(DenseLayer::output_size));
        sizes
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let dto = ModelDto::from_model(self);
        let json = serde_json::to_vec(&dto)?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(&json)?;
        enc.finish()?;
        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut dec = GzDecoder::new(file);
        let mut buf = Vec::new();
        dec.read_to_end(&mut buf)?;
        let dto: ModelDto = serde_json::from_slice(&buf)?;
        dto.into_model()
    }
}

/// Deep neural network classifier.
///
/// Hidden layers use ReLU by default; the output layer produces one logit per
/// class, and `predict` returns class indices.
pub struct DnnClassifier {
    model: DnnModel,
}

impl DnnClassifier {
    pub fn new(
        feature_columns: &[FeatureColumn],
        hidden_units: &[usize],
        n_classes: usize,
        config: RunConfig,
    ) -> Result<Self> {
        if n_classes < 2 {
            return Err(anyhow!("n_classes must be at least 2, got {}", n_classes));
        }
        Ok(Self {
            model: DnnModel::new(
                feature_columns,
                hidden_units,
                n_classes,
                Task::Classification,
                config,
            )?,
        })
    }

    /// Fraction of hidden activations dropped during training, in [0, 1).
    pub fn dropout(mut self, rate: f64) -> Self {
        self.model.dropout = rate;
        self
    }

    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.model.adam.set_learning_rate(lr);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.model.batch_size = batch_size;
        self
    }

    pub fn hidden_activation(mut self, kind: ActivationKind) -> Self {
        self.model.set_hidden_activation(&kind);
        self
    }

    /// Run up to `max_steps` minibatch training steps on the given features
    /// and integer class labels. Features are standardized with statistics
    /// frozen at the first fit.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, max_steps: usize) -> Result<()> {
        self.model.fit(x, y, max_steps)
    }

    /// Predicted class index per row, as f64 to match target vectors.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let logits = self.model.predict_logits(x)?;
        let classes = logits
            .axis_iter(Axis(0))
            .map(|row| argmax(&row.to_vec()) as f64)
            .collect();
        Ok(Array1::from_vec(classes))
    }

    /// Row-wise class probabilities.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(Softmax.apply_rows(&self.model.predict_logits(x)?))
    }

    /// Learned weight matrices in layer order, each of shape
    /// `(in_dim, out_dim)`.
    pub fn weights(&self) -> Vec<&Array2<f64>> {
        self.model.weights()
    }

    /// Learned bias vectors: one per layer plus the centered bias, so
    /// `hidden_units.len() + 2` in total.
    pub fn biases(&self) -> Vec<&Array1<f64>> {
        self.model.biases()
    }

    pub fn n_classes(&self) -> usize {
        self.model.output_dim
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.model.save(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model = DnnModel::load(path)?;
        if model.task != Task::Classification {
            return Err(anyhow!("Saved model is not a classifier"));
        }
        Ok(Self { model })
    }
}

impl fmt::Display for DnnClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DnnClassifier {:?}", self.model.layer_sizes())
    }
}

/// Deep neural network regressor with a single linear output.
pub struct DnnRegressor {
    model: DnnModel,
}

impl DnnRegressor {
    pub fn new(
        feature_columns: &[FeatureColumn],
        hidden_units: &[usize],
        config: RunConfig,
    ) -> Result<Self> {
        Ok(Self {
            model: DnnModel::new(feature_columns, hidden_units, 1, Task::Regression, config)?,
        })
    }

    pub fn dropout(mut self, rate: f64) -> Self {
        self.model.dropout = rate;
        self
    }

    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.model.adam.set_learning_rate(lr);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.model.batch_size = batch_size;
        self
    }

    pub fn hidden_activation(mut self, kind: ActivationKind) -> Self {
        self.model.set_hidden_activation(&kind);
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, steps: usize) -> Result<()> {
        self.model.fit(x, y, steps)
    }

    /// Predicted value per row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.model.predict_logits(x)?.column(0).to_owned())
    }

    pub fn weights(&self) -> Vec<&Array2<f64>> {
        self.model.weights()
    }

    pub fn biases(&self) -> Vec<&Array1<f64>> {
        self.model.biases()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.model.save(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model = DnnModel::load(path)?;
        if model.task != Task::Regression {
            return Err(anyhow!("Saved model is not a regressor"));
        }
        Ok(Self { model })
    }
}

impl fmt::Display for DnnRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DnnRegressor {:?}", self.model.layer_sizes())
    }
}

// ============ Persistence DTOs ============

#[derive(Debug, Serialize, Deserialize)]
struct LayerDto {
    input_size: usize,
    output_size: usize,
    weights: Vec<Vec<f64>>, // [input_size][output_size]
    bias: Vec<f64>,         // [output_size]
    activation: ActivationKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelDto {
    task: Task,
    input_dim: usize,
    output_dim: usize,
    dropout: f64,
    learning_rate: f64,
    batch_size: usize,
    steps_trained: u64,
    layers: Vec<LayerDto>,
    centered_bias: Vec<f64>,
    feature_means: Option<Vec<f64>>,
    feature_stds: Option<Vec<f64>>,
}

impl ModelDto {
    fn from_model(model: &DnnModel) -> Self {
        fn sanitize_f64(x: f64) -> f64 {
            if x.is_finite() {
                x
            } else {
                0.0
            }
        }
        let layers = model
            .layers
            .iter()
            .map(|layer| LayerDto {
                input_size: layer.input_size(),
                output_size: layer.output_size(),
                weights: layer
                    .weights
                    .outer_iter()
                    .map(|row| row.iter().map(|&x| sanitize_f64(x)).collect())
                    .collect(),
                bias: layer.bias.iter().map(|&x| sanitize_f64(x)).collect(),
                activation: identify_activation_kind(layer.activation.as_ref()),
            })
            .collect();
        Self {
            task: model.task,
            input_dim: model.input_dim,
            output_dim: model.output_dim,
            dropout: model.dropout,
            learning_rate: model.adam.learning_rate(),
            batch_size: model.batch_size,
            steps_trained: model.adam.step_count(),
            layers,
            centered_bias: model.centered_bias.iter().map(|&x| sanitize_f64(x)).collect(),
            feature_means: model.feature_means.as_ref().map(|m| m.to_vec()),
            feature_stds: model.feature_stds.as_ref().map(|s| s.to_vec()),
        }
    }

    fn into_model(self) -> Result<DnnModel> {
        if self.layers.is_empty() {
            return Err(anyhow!("Saved model has no layers"));
        }
        let mut rng = StdRng::from_entropy();
        let mut layers = Vec::with_capacity(self.layers.len());
        for ld in &self.layers {
            let mut layer =
                DenseLayer::new(ld.input_size, ld.output_size, ld.activation.to_arc(), &mut rng);
            let flat: Vec<f64> = ld.weights.iter().flatten().copied().collect();
            layer.weights = Array2::from_shape_vec((ld.input_size, ld.output_size), flat)?;
            layer.bias = Array1::from_vec(ld.bias.clone());
            layers.push(layer);
        }
        let weight_moments = layers.iter().map(|l| Moments::zeros_like(&l.weights)).collect();
        let bias_moments = layers.iter().map(|l| Moments::zeros_like(&l.bias)).collect();
        let centered_bias = Array1::from_vec(self.centered_bias);
        let cb_moments = Moments::zeros_like(&centered_bias);
        let mut adam = Adam::default_params(self.learning_rate);
        adam.set_step_count(self.steps_trained);
        Ok(DnnModel {
            hidden_count: layers.len() - 1,
            layers,
            centered_bias,
            input_dim: self.input_dim,
            output_dim: self.output_dim,
            task: self.task,
            dropout: self.dropout,
            batch_size: self.batch_size,
            adam,
            weight_moments,
            bias_moments,
            cb_moments,
            rng,
            cursor: 0,
            feature_means: self.feature_means.map(Array1::from_vec),
            feature_stds: self.feature_stds.map(Array1::from_vec),
        })
    }
}
