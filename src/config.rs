use std::{env, fs, num::NonZeroUsize, path::Path};

use ml_core::Device;
use serde::{Deserialize, Serialize};

use crate::{
    engine::DEFAULT_LOG_PERIOD,
    error::{Result, TrainErr},
    optim::{Sgd, WarmupMethod, WarmupMultiStepLr},
};

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_ENV_VAR: &str = "TRAIN_CONFIG";

/// Solver hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub base_lr: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub gamma: f32,
    /// Iterations where the rate is multiplied by `gamma`.
    pub steps: Vec<usize>,
    pub warmup_factor: f32,
    pub warmup_iters: usize,
    pub warmup_method: WarmupMethod,
    pub max_iter: usize,
    /// Samples per iteration across every rank.
    pub ims_per_batch: NonZeroUsize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_lr: 0.05,
            momentum: 0.9,
            weight_decay: 1e-4,
            gamma: 0.1,
            steps: vec![300, 400],
            warmup_factor: 1.0 / 3.0,
            warmup_iters: 50,
            warmup_method: WarmupMethod::Linear,
            max_iter: 500,
            ims_per_batch: NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// The synthetic regression task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub num_train: usize,
    pub num_test: usize,
    pub num_features: usize,
    /// Standard deviation of the target noise.
    pub noise: f32,
    /// Shared by every rank so they all see the same dataset.
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            num_train: 2048,
            num_test: 256,
            num_features: 8,
            noise: 0.05,
            seed: 42,
        }
    }
}

/// Everything a training run needs besides its place in the process group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub solver: SolverConfig,
    pub data: DataConfig,
    pub device: String,
    pub log_period: NonZeroUsize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            data: DataConfig::default(),
            device: Device::default().to_string(),
            log_period: NonZeroUsize::new(DEFAULT_LOG_PERIOD).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl TrainConfig {
    /// Loads the config from the first CLI argument, or else from the file
    /// named by `TRAIN_CONFIG`, or else falls back to the defaults.
    pub fn load() -> Result<Self> {
        let path = env::args().nth(1).or_else(|| env::var(CONFIG_ENV_VAR).ok());

        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| TrainErr::Config(format!("cannot read {}: {e}", path.display())))?;

        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| TrainErr::Config(e.to_string()))
    }

    pub fn device(&self) -> Result<Device> {
        Ok(self.device.parse()?)
    }

    /// The batch size of every rank, the global batch split evenly.
    ///
    /// # Errors
    /// Returns `TrainErr::Config` if `ims_per_batch` is not divisible by
    /// `world_size`.
    pub fn batch_per_rank(&self, world_size: usize) -> Result<NonZeroUsize> {
        let total = self.solver.ims_per_batch.get();

        if world_size == 0 || total % world_size != 0 {
            return Err(TrainErr::Config(format!(
                "ims_per_batch ({total}) must be divisible by the world size ({world_size})"
            )));
        }

        NonZeroUsize::new(total / world_size).ok_or_else(|| {
            TrainErr::Config(format!(
                "ims_per_batch ({total}) is smaller than the world size ({world_size})"
            ))
        })
    }

    /// Builds the scheduler, its next step being iteration `start_iter`.
    pub fn scheduler(&self, start_iter: usize) -> Result<WarmupMultiStepLr> {
        let solver = &self.solver;
        let scheduler = WarmupMultiStepLr::new(
            solver.base_lr,
            solver.steps.clone(),
            solver.gamma,
            solver.warmup_factor,
            solver.warmup_iters,
            solver.warmup_method,
        )?;

        Ok(scheduler.starting_at(start_iter))
    }

    pub fn optimizer(&self, num_params: usize) -> Sgd {
        let solver = &self.solver;
        Sgd::new(num_params, solver.base_lr, solver.momentum, solver.weight_decay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_the_other_defaults() {
        let raw = r#"{ "solver": { "max_iter": 20 }, "device": "cpu" }"#;
        let cfg = TrainConfig::from_json(raw).unwrap();

        assert_eq!(cfg.solver.max_iter, 20);
        assert_eq!(cfg.solver.steps, SolverConfig::default().steps);
        assert_eq!(cfg.data, DataConfig::default());
        assert_eq!(cfg.device().unwrap(), Device::Cpu);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            TrainConfig::from_json(r#"{ "solver": { "lr": 0.1 } }"#),
            Err(TrainErr::Config(_))
        ));
    }

    #[test]
    fn zero_batch_is_rejected() {
        assert!(TrainConfig::from_json(r#"{ "solver": { "ims_per_batch": 0 } }"#).is_err());
    }

    #[test]
    fn global_batch_is_split_between_ranks() {
        let cfg = TrainConfig::default();

        assert_eq!(cfg.batch_per_rank(4).unwrap().get(), 4);
        assert!(cfg.batch_per_rank(3).is_err());
        assert!(cfg.batch_per_rank(32).is_err());
    }

    #[test]
    fn decreasing_steps_fail_to_build_a_scheduler() {
        let mut cfg = TrainConfig::default();
        cfg.solver.steps = vec![10, 5];

        assert!(matches!(cfg.scheduler(0), Err(TrainErr::Ml(_))));
    }

    #[test]
    fn unknown_device_is_a_config_error() {
        let cfg = TrainConfig {
            device: "tpu".to_string(),
            ..Default::default()
        };

        assert!(cfg.device().is_err());
    }
}
