//! Seeded synthetic regression data: `y = x · w + b + noise`.

use ml_core::MlError;
use ndarray::{Array1, Array2};
use ndarray_rand::{
    RandomExt,
    rand_distr::{Normal, Uniform},
};
use rand::Rng;

use super::InMemoryDataset;

/// A random linear relation between features and targets.
#[derive(Debug, Clone)]
pub struct LinearTask {
    weights: Array1<f32>,
    bias: f32,
    noise: f32,
}

impl LinearTask {
    /// Draws weights and bias uniformly from `[-1, 1)`.
    ///
    /// # Arguments
    /// * `num_features` - The amount of input features.
    /// * `noise` - Standard deviation of the gaussian noise added to every target.
    /// * `rng` - A random number generator.
    pub fn random<R: Rng>(num_features: usize, noise: f32, rng: &mut R) -> Result<Self, MlError> {
        let unit = unit_interval()?;

        Ok(Self {
            weights: Array1::random_using(num_features, &unit, rng),
            bias: rng.sample(&unit),
            noise,
        })
    }

    pub fn weights(&self) -> &Array1<f32> {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Samples `num_samples` pairs with features drawn uniformly from `[-1, 1)`.
    pub fn sample<R: Rng>(
        &self,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<InMemoryDataset, MlError> {
        let noise = Normal::new(0.0, self.noise)
            .map_err(|e| MlError::InvalidConfig(format!("invalid noise {}: {e}", self.noise)))?;

        let inputs = Array2::random_using((num_samples, self.weights.len()), unit_interval()?, rng);
        let noise = Array1::random_using(num_samples, noise, rng);
        let targets = inputs.dot(&self.weights) + self.bias + noise;

        InMemoryDataset::new(inputs, targets)
    }
}

fn unit_interval() -> Result<Uniform<f32>, MlError> {
    Uniform::new(-1.0, 1.0).map_err(|e| MlError::InvalidConfig(format!("invalid range: {e}")))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn noiseless_targets_follow_the_relation() {
        let mut rng = StdRng::seed_from_u64(7);
        let task = LinearTask::random(3, 0.0, &mut rng).unwrap();
        let ds = task.sample(16, &mut rng).unwrap();

        assert_eq!(ds.len(), 16);
        assert_eq!(ds.num_features(), 3);

        let batch = ds.select(&[0, 5]);
        let expected = batch.inputs.dot(task.weights()) + task.bias();
        for (got, want) in batch.targets.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-5);
        }
    }

    #[test]
    fn same_seed_same_data() {
        let draw = || {
            let mut rng = StdRng::seed_from_u64(3);
            let task = LinearTask::random(2, 0.1, &mut rng).unwrap();
            task.sample(4, &mut rng).unwrap().select(&[0, 1, 2, 3])
        };

        assert_eq!(draw(), draw());
    }

    #[test]
    fn negative_noise_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let task = LinearTask::random(1, -1.0, &mut rng).unwrap();
        assert!(task.sample(1, &mut rng).is_err());
    }
}
