use ml_core::{LossDict, MlError, Model};
use ndarray::{Array1, Array2, ArrayView1};

use crate::data::Batch;

const DEFAULT_BETA: f32 = 1.0 / 9.0;

/// Inputs kept from the last training forward pass, needed by `backward`.
#[derive(Debug)]
struct Cache {
    inputs: Array2<f32>,
    residuals: Array1<f32>,
}

/// A linear regressor `y = x · w + b` trained on two loss components:
/// `loss_mse` (mean squared error) and `loss_smooth_l1` (Huber-like, with a
/// quadratic region of width `beta`).
///
/// Parameters are laid out as `[w_0, .., w_{n-1}, b]`.
#[derive(Debug)]
pub struct LinearRegression {
    num_features: usize,
    beta: f32,
    params: Vec<f32>,
    grads: Vec<f32>,
    training: bool,
    cache: Option<Cache>,
}

impl LinearRegression {
    /// Creates a new `LinearRegression` with every parameter set to zero.
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            beta: DEFAULT_BETA,
            params: vec![0.0; num_features + 1],
            grads: vec![0.0; num_features + 1],
            training: true,
            cache: None,
        }
    }

    /// Sets the width of the quadratic region of the smooth L1 loss.
    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn weights(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(&self.params[..self.num_features])
    }

    pub fn bias(&self) -> f32 {
        self.params[self.num_features]
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Computes `x · w + b` for every row of `inputs`.
    ///
    /// # Errors
    /// Returns `MlError::ShapeMismatch` if `inputs` has the wrong amount of columns.
    pub fn predict(&self, inputs: &Array2<f32>) -> Result<Array1<f32>, MlError> {
        if inputs.ncols() != self.num_features {
            return Err(MlError::ShapeMismatch {
                what: "features",
                got: inputs.ncols(),
                expected: self.num_features,
            });
        }

        Ok(inputs.dot(&self.weights()) + self.bias())
    }

    fn smooth_l1(&self, r: f32) -> f32 {
        if r.abs() < self.beta {
            0.5 * r * r / self.beta
        } else {
            r.abs() - 0.5 * self.beta
        }
    }

    fn smooth_l1_prime(&self, r: f32) -> f32 {
        if r.abs() < self.beta {
            r / self.beta
        } else {
            r.signum()
        }
    }
}

impl Model for LinearRegression {
    type Batch = Batch;

    fn train(&mut self) {
        self.training = true;
    }

    fn eval(&mut self) {
        self.training = false;
        self.cache = None;
    }

    fn forward(&mut self, batch: &Batch) -> Result<LossDict, MlError> {
        if batch.is_empty() {
            return Err(MlError::InvalidInput("empty batch"));
        }

        let residuals = self.predict(&batch.inputs)? - &batch.targets;
        let n = residuals.len() as f32;

        let mse = residuals.mapv(|r| r * r).sum() / n;
        let smooth_l1 = residuals.mapv(|r| self.smooth_l1(r)).sum() / n;

        if !mse.is_finite() || !smooth_l1.is_finite() {
            return Err(MlError::InvalidInput("non-finite loss"));
        }

        if self.training {
            self.cache = Some(Cache {
                inputs: batch.inputs.clone(),
                residuals,
            });
        }

        let mut losses = LossDict::new();
        losses.insert("loss_mse", mse);
        losses.insert("loss_smooth_l1", smooth_l1);
        Ok(losses)
    }

    fn zero_grad(&mut self) {
        self.grads.fill(0.0);
    }

    fn backward(&mut self) -> Result<(), MlError> {
        let Some(Cache { inputs, residuals }) = self.cache.take() else {
            return Err(MlError::InvalidInput("backward without a training forward pass"));
        };

        let n = residuals.len() as f32;
        let d_pred = residuals.mapv(|r| (2.0 * r + self.smooth_l1_prime(r)) / n);

        let d_weights = inputs.t().dot(&d_pred);
        let (grad_w, grad_b) = self.grads.split_at_mut(self.num_features);

        grad_w
            .iter_mut()
            .zip(d_weights.iter())
            .for_each(|(g, d)| *g += d);
        grad_b[0] += d_pred.sum();

        Ok(())
    }

    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params, &self.grads)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::data::InMemoryDataset;

    fn batch() -> Batch {
        InMemoryDataset::new(array![[1.0, 0.0], [0.0, 2.0]], array![1.0, -2.0])
            .unwrap()
            .select(&[0, 1])
    }

    #[test]
    fn forward_reports_both_components() {
        let mut model = LinearRegression::new(2).with_beta(1.0);
        let losses = model.forward(&batch()).unwrap();

        let names: Vec<_> = losses.names().collect();
        assert_eq!(names, ["loss_mse", "loss_smooth_l1"]);

        // residuals are (-1, 2)
        assert_eq!(losses.get("loss_mse"), Some(2.5));
        assert_eq!(losses.get("loss_smooth_l1"), Some(1.0));
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut model = LinearRegression::new(2).with_beta(0.5);
        model.params.copy_from_slice(&[0.3, -0.2, 0.1]);

        model.forward(&batch()).unwrap();
        model.zero_grad();
        model.backward().unwrap();
        let analytic = model.grads.clone();

        let eps = 1e-3;
        for i in 0..model.num_params() {
            let original = model.params[i];

            model.params[i] = original + eps;
            let up = model.forward(&batch()).unwrap().total();
            model.params[i] = original - eps;
            let down = model.forward(&batch()).unwrap().total();
            model.params[i] = original;

            let numeric = (up - down) / (2.0 * eps);
            assert!(
                (numeric - analytic[i]).abs() < 1e-2,
                "param {i}: numeric {numeric}, analytic {}",
                analytic[i]
            );
        }
    }

    #[test]
    fn backward_needs_a_training_forward() {
        let mut model = LinearRegression::new(2);
        assert!(model.backward().is_err());

        model.eval();
        model.forward(&batch()).unwrap();
        assert!(model.backward().is_err());
    }

    #[test]
    fn wrong_feature_count_fails_forward() {
        let mut model = LinearRegression::new(3);
        assert!(matches!(
            model.forward(&batch()),
            Err(MlError::ShapeMismatch { what: "features", got: 2, expected: 3 })
        ));
    }
}
