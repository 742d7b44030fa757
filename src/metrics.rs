//! Metrics for evaluating estimator quality.
use ndarray::{Array1, Array2};

/// Fraction of predictions equal to the ground-truth labels, in [0, 1].
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "Predictions and targets must have same length"
    );
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|&(&t, &p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Mean squared error between predictions and ground truth.
pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "Predictions and targets must have same length"
    );
    y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// Confusion matrix: element `[i][j]` counts samples with true class `i`
/// predicted as class `j`. Labels outside `0..n_classes` are ignored.
pub fn confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>, n_classes: usize) -> Array2<usize> {
    let mut cm = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred) {
        let (t, p) = (t as usize, p as usize);
        if t < n_classes && p < n_classes {
            cm[[t, p]] += 1;
        }
    }
    cm
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn accuracy_counts_exact_matches() {
        let truth = array![0.0, 1.0, 2.0, 1.0];
        let pred = array![0.0, 1.0, 1.0, 1.0];
        assert!((accuracy_score(&truth, &pred) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn mse_on_known_values() {
        let truth = array![1.0, 2.0];
        let pred = array![1.0, 4.0];
        assert!((mean_squared_error(&truth, &pred) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn confusion_matrix_diagonal_for_perfect_predictions() {
        let truth = array![0.0, 1.0, 2.0, 2.0];
        let cm = confusion_matrix(&truth, &truth, 3);
        assert_eq!(cm[[0, 0]], 1);
        assert_eq!(cm[[1, 1]], 1);
        assert_eq!(cm[[2, 2]], 2);
        assert_eq!(cm.sum(), 4);
    }
}
