use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Floor for predicted probabilities so `ln` stays finite.
const PROB_FLOOR: f32 = 1e-12;

/// Multi-class cross-entropy over one-hot targets and softmax outputs.
///
/// `loss_prime` is the fused softmax + cross-entropy delta `a - y`; the output
/// layer consumes it directly, without a softmax Jacobian.
#[derive(Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows() as f32;
        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0.0, |acc, &a, &t| acc - t * a.max(PROB_FLOOR).ln());

        total / n
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        &y_pred - &y
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_prediction_costs_nothing() {
        let y = array![[0.0, 1.0], [1.0, 0.0]];

        let loss = CrossEntropy.loss(y.view(), y.view());

        assert!(loss.abs() < 1e-5);
    }

    #[test]
    fn uniform_guess_costs_ln_k() {
        let y_pred = array![[0.25, 0.25, 0.25, 0.25]];
        let y = array![[0.0, 0.0, 1.0, 0.0]];

        let loss = CrossEntropy.loss(y_pred.view(), y.view());

        assert!((loss - 4.0f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn prime_is_the_fused_delta() {
        let y_pred = array![[0.7, 0.2, 0.1]];
        let y = array![[0.0, 1.0, 0.0]];

        let d = CrossEntropy.loss_prime(y_pred.view(), y.view());

        assert_eq!(d, array![[0.7, -0.8, 0.1]]);
    }

    #[test]
    fn zero_probability_stays_finite() {
        let y_pred = array![[0.0, 1.0]];
        let y = array![[1.0, 0.0]];

        let loss = CrossEntropy.loss(y_pred.view(), y.view());

        assert!(loss.is_finite());
    }
}
