//! Adam optimizer used by the estimator training loop.
use ndarray::{Array, Dimension, Zip};

/// First and second moment buffers for a single parameter tensor.
#[derive(Debug, Clone)]
pub struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    pub fn zeros_like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }
}

/// Adam optimizer.
///
/// Standard update: θ_t = θ_{t-1} - lr * m̂_t / (√v̂_t + ε), with
/// bias-corrected moment estimates m̂ and v̂. One `begin_step` per training
/// step advances the shared bias-correction counter for all tensors.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u64,
}

impl Adam {
    pub fn new(lr: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
        }
    }

    /// Adam with the usual β₁ = 0.9, β₂ = 0.999, ε = 1e-8.
    pub fn default_params(lr: f64) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    /// Get optimizer step counter.
    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Set optimizer step counter (for resumed models).
    pub fn set_step_count(&mut self, t: u64) {
        self.t = t;
    }

    /// Advance the step counter. Call once per training step, before the
    /// per-tensor updates.
    pub fn begin_step(&mut self) {
        self.t += 1;
    }

    /// Apply one Adam update to `param` given its gradient and moments.
    pub fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        state: &mut Moments<D>,
    ) {
        let (b1, b2) = (self.beta1, self.beta2);
        state.m.zip_mut_with(grad, |m, &g| *m = b1 * *m + (1.0 - b1) * g);
        state.v.zip_mut_with(grad, |v, &g| *v = b2 * *v + (1.0 - b2) * g * g);

        let t = self.t.max(1) as i32;
        let corr1 = 1.0 - b1.powi(t);
        let corr2 = 1.0 - b2.powi(t);
        let lr = self.lr;
        let eps = self.epsilon;
        Zip::from(param)
            .and(&state.m)
            .and(&state.v)
            .for_each(|p, &m, &v| {
                let m_hat = m / corr1;
                let v_hat = v / corr2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    /// Adam on f(x) = x² should walk every coordinate toward 0.
    #[test]
    fn converges_on_quadratic() {
        let mut params = Array1::from_vec(vec![3.0, -2.0, 1.5, -2.5]);
        let mut state = Moments::zeros_like(&params);
        let mut adam = Adam::default_params(0.1);
        for _ in 0..300 {
            let grad = params.mapv(|x| 2.0 * x);
            adam.begin_step();
            adam.update(&mut params, &grad, &mut state);
        }
        assert!(
            params.iter().all(|&p| p.abs() < 0.05),
            "params = {:?}",
            params
        );
    }

    #[test]
    fn step_size_is_bounded_by_lr() {
        let mut params = Array1::from_vec(vec![100.0]);
        let mut state = Moments::zeros_like(&params);
        let mut adam = Adam::default_params(0.05);
        let grad = Array1::from_vec(vec![1.0e6]);
        adam.begin_step();
        adam.update(&mut params, &grad, &mut state);
        // Bias-corrected first step moves by roughly lr regardless of scale
        assert!((params[0] - 100.0).abs() < 0.06);
    }
}
