use crate::{LossDict, MlError};

/// A trainable model that reports its objective as named loss components.
///
/// A `Model` owns its flat parameter and gradient buffers. It does not:
/// - access datasets,
/// - decide how parameters are updated,
/// - implement training loops.
pub trait Model {
    /// Input type consumed by `forward`, usually inputs and targets together.
    type Batch;

    /// Switches the model into training mode.
    fn train(&mut self);

    /// Switches the model into evaluation mode.
    fn eval(&mut self);

    /// Computes the loss components for a batch.
    ///
    /// The inputs needed by the next `backward` call are cached by the model.
    ///
    /// # Errors
    /// Returns `MlError` if the batch cannot be processed (e.g. shape mismatch
    /// or a non-finite loss).
    fn forward(&mut self, batch: &Self::Batch) -> Result<LossDict, MlError>;

    /// Sets every gradient to zero.
    fn zero_grad(&mut self);

    /// Accumulates into the gradient buffer the gradient of the total loss of
    /// the most recent `forward` call.
    ///
    /// # Errors
    /// Returns `MlError::InvalidInput` if no forward pass is cached.
    fn backward(&mut self) -> Result<(), MlError>;

    /// Returns the parameters (mutable) along with their gradients.
    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]);
}
