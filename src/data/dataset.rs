use ml_core::{Device, MlError, ToDevice};
use ndarray::{Array1, Array2, Axis};

/// Supervised samples held in memory: one input row and one scalar target each.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    inputs: Array2<f32>,
    targets: Array1<f32>,
}

impl InMemoryDataset {
    /// Creates a new dataset from owned arrays.
    ///
    /// # Errors
    /// Returns `MlError::ShapeMismatch` if the amount of input rows and targets differ.
    pub fn new(inputs: Array2<f32>, targets: Array1<f32>) -> Result<Self, MlError> {
        if inputs.nrows() != targets.len() {
            return Err(MlError::ShapeMismatch {
                what: "targets",
                got: targets.len(),
                expected: inputs.nrows(),
            });
        }

        Ok(Self { inputs, targets })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.inputs.ncols()
    }

    /// Copies the samples at `indices` into a batch.
    ///
    /// # Panics
    /// If an index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Batch {
        Batch {
            inputs: self.inputs.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            indices: indices.to_vec(),
        }
    }
}

/// A batch of samples along with their dataset indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Array2<f32>,
    pub targets: Array1<f32>,
    pub indices: Vec<usize>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl ToDevice for Batch {
    fn to_device(self, device: Device) -> Result<Self, MlError> {
        Ok(Self {
            inputs: self.inputs.to_device(device)?,
            targets: self.targets.to_device(device)?,
            indices: self.indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn select_copies_rows_and_targets() {
        let inputs = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let ds = InMemoryDataset::new(inputs, array![1.0, 2.0, 3.0]).unwrap();

        let batch = ds.select(&[2, 0]);
        assert_eq!(batch.inputs, array![[5.0, 6.0], [1.0, 2.0]]);
        assert_eq!(batch.targets, array![3.0, 1.0]);
        assert_eq!(batch.indices, [2, 0]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let ret = InMemoryDataset::new(array![[1.0], [2.0]], array![1.0]);
        assert!(matches!(ret, Err(MlError::ShapeMismatch { got: 1, expected: 2, .. })));
    }

    #[test]
    fn batches_only_move_to_cpu() {
        let ds = InMemoryDataset::new(array![[1.0]], array![1.0]).unwrap();
        let batch = ds.select(&[0]);

        assert_eq!(batch.clone().to_device(Device::Cpu), Ok(batch.clone()));
        assert!(batch.to_device(Device::Cuda(0)).is_err());
    }
}
