use ml_core::{MlError, Optimizer};

/// Stochastic gradient descent with momentum and L2 weight decay.
#[derive(Debug)]
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    velocity: Box<[f32]>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Fraction of the previous update carried into the next one.
    /// * `weight_decay` - L2 penalty coefficient added to the gradient.
    ///
    /// # Returns
    /// A new `Sgd` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Sgd {
    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn step(&mut self, params: &mut [f32], grads: &[f32]) -> Result<(), MlError> {
        if grads.len() != params.len() {
            return Err(MlError::ShapeMismatch {
                what: "grads",
                got: grads.len(),
                expected: params.len(),
            });
        }

        if self.velocity.len() != params.len() {
            return Err(MlError::ShapeMismatch {
                what: "params",
                got: params.len(),
                expected: self.velocity.len(),
            });
        }

        let lr = self.learning_rate;
        let mu = self.momentum;
        let wd = self.weight_decay;

        params
            .iter_mut()
            .zip(grads)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                let d = g + wd * *p;
                *v = (mu * *v) + d;
                *p -= lr * *v;
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_step_follows_the_gradient() {
        let mut sgd = Sgd::new(2, 0.5, 0.0, 0.0);
        let mut params = [1.0, -1.0];

        sgd.step(&mut params, &[2.0, -2.0]).unwrap();
        assert_eq!(params, [0.0, 0.0]);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let mut sgd = Sgd::new(1, 1.0, 0.5, 0.0);
        let mut params = [0.0];

        sgd.step(&mut params, &[1.0]).unwrap();
        assert_eq!(params, [-1.0]);

        sgd.step(&mut params, &[1.0]).unwrap();
        assert_eq!(params, [-2.5]);
    }

    #[test]
    fn weight_decay_shrinks_parameters() {
        let mut sgd = Sgd::new(1, 0.1, 0.0, 1.0);
        let mut params = [2.0];

        sgd.step(&mut params, &[0.0]).unwrap();
        assert!((params[0] - 1.8).abs() < 1e-6);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let mut sgd = Sgd::new(2, 0.1, 0.0, 0.0);

        assert!(sgd.step(&mut [0.0, 0.0], &[1.0]).is_err());
        assert!(sgd.step(&mut [0.0], &[1.0]).is_err());
    }

    #[test]
    fn learning_rate_can_be_replaced() {
        let mut sgd = Sgd::new(1, 0.1, 0.0, 0.0);
        sgd.set_learning_rate(0.01);
        assert_eq!(sgd.learning_rate(), 0.01);
    }
}
