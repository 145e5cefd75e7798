/// A source of batches addressed by batch index.
///
/// `len` counts every batch the loader can produce, including the ones
/// before the `start` given to `iter_from`. This lets a training run resume
/// at an iteration while still knowing the total amount of iterations.
pub trait DataLoader {
    type Batch;

    /// Total number of batches.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Yields the batches `start..len` in order.
    fn iter_from(&mut self, start: usize) -> impl Iterator<Item = Self::Batch> + '_;
}
