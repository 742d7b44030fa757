//! Activation functions used by the dense layers.
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Trait for activation functions.
pub trait Activation: fmt::Debug + Send + Sync + Any {
    fn apply(&self, x: f64) -> f64;
    fn derivative(&self, x: f64) -> f64;
    fn apply_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|xi| self.apply(xi))
    }
}

/// ReLU: max(0, x)
#[derive(Debug, Clone, Default)]
pub struct ReLU;

impl Activation for ReLU {
    fn apply(&self, x: f64) -> f64 {
        x.max(0.0)
    }
    fn derivative(&self, x: f64) -> f64 {
        (x > 0.0) as u8 as f64
    }
}

/// Sigmoid: 1 / (1 + exp(-x))
#[derive(Debug, Clone, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }
    fn derivative(&self, x: f64) -> f64 {
        let s = self.apply(x);
        s * (1.0 - s)
    }
}

/// Tanh: (exp(x) - exp(-x)) / (exp(x) + exp(-x))
#[derive(Debug, Clone, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn apply(&self, x: f64) -> f64 {
        x.tanh()
    }
    fn derivative(&self, x: f64) -> f64 {
        let t = self.apply(x);
        1.0 - t * t
    }
}

/// Linear: identity
#[derive(Debug, Clone, Default)]
pub struct Linear;

impl Activation for Linear {
    fn apply(&self, x: f64) -> f64 {
        x
    }
    fn derivative(&self, _x: f64) -> f64 {
        1.0
    }
}

/// Softmax (vector-only)
#[derive(Debug, Clone, Default)]
pub struct Softmax;

impl Softmax {
    pub fn apply_vec(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let max = x.iter().fold(f64::MIN, |a, &b| a.max(b));
        let exps: Vec<f64> = x.iter().map(|&xi| (xi - max).exp()).collect();
        let exp_sum: f64 = exps.iter().sum();
        if !exp_sum.is_finite() || exp_sum <= 0.0 {
            // Fallback to uniform distribution to avoid NaNs
            let n = x.len() as f64;
            return vec![1.0 / n; x.len()];
        }
        exps.into_iter().map(|e| e / exp_sum).collect()
    }

    /// Row-wise softmax over a batch of logits.
    pub fn apply_rows(&self, logits: &Array2<f64>) -> Array2<f64> {
        let mut probs = logits.clone();
        for mut row in probs.axis_iter_mut(Axis(0)) {
            let soft = self.apply_vec(&row.to_vec());
            for (p, s) in row.iter_mut().zip(soft) {
                *p = s;
            }
        }
        probs
    }
}

/// Serializable activation kinds for persistence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationKind {
    ReLU,
    Sigmoid,
    Tanh,
    Linear,
}

impl ActivationKind {
    pub fn to_arc(&self) -> std::sync::Arc<dyn Activation + Send + Sync> {
        use std::sync::Arc;
        match self {
            ActivationKind::ReLU => Arc::new(ReLU),
            ActivationKind::Sigmoid => Arc::new(Sigmoid),
            ActivationKind::Tanh => Arc::new(Tanh),
            ActivationKind::Linear => Arc::new(Linear),
        }
    }
}

/// Best-effort identification of activation kind from a trait object
pub fn identify_activation_kind(a: &(dyn Activation + Send + Sync)) -> ActivationKind {
    let any = a as &dyn Any;
    if any.is::<ReLU>() {
        return ActivationKind::ReLU;
    }
    if any.is::<Sigmoid>() {
        return ActivationKind::Sigmoid;
    }
    if any.is::<Tanh>() {
        return ActivationKind::Tanh;
    }
    ActivationKind::Linear
}

/// Argmax over a slice of scores; the first maximum wins on ties.
pub fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold(0usize, |max_i, (i, &v)| if v > scores[max_i] { i } else { max_i })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn relu_clamps_negative() {
        assert_eq!(ReLU.apply(-3.0), 0.0);
        assert_eq!(ReLU.apply(2.5), 2.5);
        assert_eq!(ReLU.derivative(-1.0), 0.0);
        assert_eq!(ReLU.derivative(1.0), 1.0);
    }

    #[test]
    fn softmax_rows_are_distributions() {
        let logits = array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]];
        let probs = Softmax.apply_rows(&logits);
        for row in probs.axis_iter(Axis(0)) {
            let sum: f64 = row.sum();
            assert!((sum - 1.0).abs() < 1e-9, "row sums to {}", sum);
        }
        // Largest logit keeps the largest probability
        assert!(probs[[0, 2]] > probs[[0, 1]] && probs[[0, 1]] > probs[[0, 0]]);
    }

    #[test]
    fn argmax_breaks_ties_on_first() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax(&[0.1, 0.9, 0.2]), 1);
    }

    #[test]
    fn activation_kind_round_trips() {
        let kind = identify_activation_kind(&Tanh);
        assert_eq!(kind, ActivationKind::Tanh);
        let back = kind.to_arc();
        assert_eq!(back.apply(0.0), 0.0);
    }
}
