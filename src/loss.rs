//! Loss functions for the estimator training loop.
use crate::activations::Softmax;
use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2};

/// MSE loss over a batch of scalar predictions.
pub fn mse_loss(pred: &Array1<f64>, target: &Array1<f64>) -> f64 {
    if pred.len() != target.len() {
        panic!("Pred and target size mismatch");
    }
    pred.iter()
        .zip(target)
        .map(|(&p, &t)| (p - t).powi(2))
        .sum::<f64>()
        / pred.len() as f64
}

/// MSE gradient with respect to predictions.
pub fn mse_deriv(pred: &Array1<f64>, target: &Array1<f64>) -> Array1<f64> {
    let n = pred.len() as f64;
    (pred - target) * (2.0 / n)
}

/// Mean softmax cross-entropy over a batch of logits against integer class
/// labels.
pub fn softmax_cross_entropy(logits: &Array2<f64>, labels: &Array1<f64>) -> Result<f64> {
    if logits.nrows() != labels.len() {
        return Err(anyhow!("Size mismatch"));
    }
    let probs = Softmax.apply_rows(logits);
    let eps = 1e-12;
    let mut loss = 0.0;
    for (i, &label) in labels.iter().enumerate() {
        let c = label as usize;
        if c >= logits.ncols() {
            return Err(anyhow!("Label {} out of range for {} classes", label, logits.ncols()));
        }
        let p = probs[[i, c]].clamp(eps, 1.0 - eps);
        loss -= p.ln();
    }
    Ok(loss / labels.len() as f64)
}

/// Gradient of mean softmax cross-entropy with respect to the logits:
/// `(softmax(logits) - onehot(labels)) / batch`.
pub fn softmax_cross_entropy_deriv(logits: &Array2<f64>, labels: &Array1<f64>) -> Array2<f64> {
    let n = logits.nrows() as f64;
    let mut delta = Softmax.apply_rows(logits);
    for (i, &label) in labels.iter().enumerate() {
        delta[[i, label as usize]] -= 1.0;
    }
    delta / n
}
