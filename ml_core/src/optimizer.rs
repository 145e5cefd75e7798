use crate::MlError;

/// Updates parameters given their gradient.
pub trait Optimizer {
    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, learning_rate: f32);

    /// Updates `params` according to the optimizer's learning rule.
    ///
    /// # Errors
    /// Returns `MlError::ShapeMismatch` if `params` and `grads` differ in length
    /// or do not match the optimizer's state.
    fn step(&mut self, params: &mut [f32], grads: &[f32]) -> Result<(), MlError>;
}

/// Decides the learning rate of every training iteration.
pub trait LrScheduler {
    /// Advances one iteration and returns the learning rate to use for it.
    fn step(&mut self) -> f32;

    /// The learning rate returned by the last `step`.
    fn last_lr(&self) -> f32;
}
