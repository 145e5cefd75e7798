use ml_core::{LrScheduler, MlError};
use serde::{Deserialize, Serialize};

/// How the learning rate ramps up during the warm-up iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupMethod {
    /// The base rate scaled by the warm-up factor for every warm-up iteration.
    Constant,
    /// A linear ramp from `warmup_factor` to 1.
    #[default]
    Linear,
}

/// Multi-step decay with an initial warm-up.
///
/// The rate of iteration `t` is
/// `base_lr * warmup(t) * gamma ^ (number of milestones <= t)`.
#[derive(Debug, Clone)]
pub struct WarmupMultiStepLr {
    base_lr: f32,
    milestones: Vec<usize>,
    gamma: f32,
    warmup_factor: f32,
    warmup_iters: usize,
    warmup_method: WarmupMethod,
    next_iter: usize,
    last_lr: f32,
}

impl WarmupMultiStepLr {
    /// Creates a new `WarmupMultiStepLr`.
    ///
    /// # Arguments
    /// * `base_lr` - The rate after warm-up and before any milestone.
    /// * `milestones` - Strictly increasing iterations where the rate is multiplied by `gamma`.
    /// * `gamma` - The decay factor.
    /// * `warmup_factor` - The fraction of `base_lr` used at iteration 0.
    /// * `warmup_iters` - The amount of warm-up iterations.
    /// * `warmup_method` - The warm-up shape.
    ///
    /// # Returns
    /// The scheduler or an error if the milestones are not strictly increasing.
    pub fn new(
        base_lr: f32,
        milestones: Vec<usize>,
        gamma: f32,
        warmup_factor: f32,
        warmup_iters: usize,
        warmup_method: WarmupMethod,
    ) -> Result<Self, MlError> {
        if milestones.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MlError::InvalidConfig(format!(
                "milestones should be a list of increasing integers, got {milestones:?}"
            )));
        }

        Ok(Self {
            base_lr,
            milestones,
            gamma,
            warmup_factor,
            warmup_iters,
            warmup_method,
            next_iter: 0,
            last_lr: base_lr,
        })
    }

    /// Makes the next `step` return the rate of iteration `iter`, used when
    /// resuming a run.
    pub fn starting_at(mut self, iter: usize) -> Self {
        self.next_iter = iter;
        self
    }

    /// The learning rate of iteration `iter`.
    pub fn lr_at(&self, iter: usize) -> f32 {
        let warmup = if iter < self.warmup_iters {
            match self.warmup_method {
                WarmupMethod::Constant => self.warmup_factor,
                WarmupMethod::Linear => {
                    let alpha = iter as f32 / self.warmup_iters as f32;
                    self.warmup_factor * (1.0 - alpha) + alpha
                }
            }
        } else {
            1.0
        };

        let decays = self.milestones.partition_point(|&m| m <= iter);
        self.base_lr * warmup * self.gamma.powi(decays as i32)
    }
}

impl LrScheduler for WarmupMultiStepLr {
    fn step(&mut self) -> f32 {
        self.last_lr = self.lr_at(self.next_iter);
        self.next_iter += 1;
        self.last_lr
    }

    fn last_lr(&self) -> f32 {
        self.last_lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn linear_warmup_then_steps() {
        let mut sched =
            WarmupMultiStepLr::new(0.1, vec![4, 6], 0.1, 0.5, 2, WarmupMethod::Linear).unwrap();

        let lrs: Vec<_> = (0..8).map(|_| sched.step()).collect();
        let expected = [0.05, 0.075, 0.1, 0.1, 0.01, 0.01, 0.001, 0.001];

        for (got, want) in lrs.iter().zip(expected) {
            assert!(close(*got, want), "got {got}, want {want}");
        }
        assert!(close(sched.last_lr(), 0.001));
    }

    #[test]
    fn constant_warmup_uses_the_factor() {
        let sched =
            WarmupMultiStepLr::new(1.0, vec![], 0.1, 0.25, 3, WarmupMethod::Constant).unwrap();

        assert!(close(sched.lr_at(0), 0.25));
        assert!(close(sched.lr_at(2), 0.25));
        assert!(close(sched.lr_at(3), 1.0));
    }

    #[test]
    fn resuming_continues_the_schedule() {
        let mut sched = WarmupMultiStepLr::new(1.0, vec![5], 0.5, 1.0, 0, WarmupMethod::Linear)
            .unwrap()
            .starting_at(5);

        assert!(close(sched.step(), 0.5));
    }

    #[test]
    fn unordered_milestones_are_rejected() {
        let ret = WarmupMultiStepLr::new(0.1, vec![5, 5], 0.1, 1.0, 0, WarmupMethod::Linear);
        assert!(matches!(ret, Err(MlError::InvalidConfig(_))));
    }
}
