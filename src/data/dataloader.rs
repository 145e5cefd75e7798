use std::num::NonZeroUsize;

use ml_core::DataLoader;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{Batch, InMemoryDataset, ShardSpec};

#[derive(Debug, Clone, Copy)]
enum Mode {
    /// One ordered pass over the shard.
    Sequential,
    /// Cycles over the shard, reshuffled every epoch, for a fixed amount of batches.
    IterationBased { num_iterations: usize, seed: u64 },
}

/// Shard-aware loader producing owned batches of an `InMemoryDataset`.
///
/// Batch `i` is a pure function of `i`, so a run can resume at any iteration
/// and see the same batches it would have seen without the interruption.
/// Loaders of the same dataset on different ranks always have the same `len`.
#[derive(Debug, Clone)]
pub struct InMemoryDataLoader {
    dataset: InMemoryDataset,
    shard: ShardSpec,
    batch_size: NonZeroUsize,
    mode: Mode,
}

impl InMemoryDataLoader {
    /// Creates a loader making one ordered pass over this rank's shard, the
    /// last batch may be smaller.
    pub fn sequential(
        dataset: InMemoryDataset,
        shard: ShardSpec,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self::new(dataset, shard, batch_size, Mode::Sequential)
    }

    /// Creates a loader yielding exactly `num_iterations` batches of this
    /// rank's shard.
    ///
    /// Every epoch the whole dataset is reshuffled from `seed` and the epoch,
    /// so ranks sharing `seed` split the same permutation between them.
    pub fn iteration_based(
        dataset: InMemoryDataset,
        shard: ShardSpec,
        batch_size: NonZeroUsize,
        num_iterations: usize,
        seed: u64,
    ) -> Self {
        let mode = Mode::IterationBased {
            num_iterations,
            seed,
        };

        Self::new(dataset, shard, batch_size, mode)
    }

    fn new(
        dataset: InMemoryDataset,
        shard: ShardSpec,
        batch_size: NonZeroUsize,
        mode: Mode,
    ) -> Self {
        Self {
            dataset,
            shard,
            batch_size,
            mode,
        }
    }

    /// The amount of samples this rank visits per epoch, padding included.
    #[inline]
    pub fn samples_per_epoch(&self) -> usize {
        self.shard.num_samples(self.dataset.len())
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    fn batches_per_epoch(&self) -> usize {
        self.samples_per_epoch().div_ceil(self.batch_size.get())
    }

    /// This rank's samples for `epoch`, in visiting order.
    fn epoch_order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<_> = (0..self.dataset.len()).collect();

        if let Mode::IterationBased { seed, .. } = self.mode {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }

        self.shard.take(&order)
    }
}

impl DataLoader for InMemoryDataLoader {
    type Batch = Batch;

    fn len(&self) -> usize {
        match self.mode {
            Mode::Sequential => self.batches_per_epoch(),
            Mode::IterationBased { .. } if self.dataset.is_empty() => 0,
            Mode::IterationBased { num_iterations, .. } => num_iterations,
        }
    }

    fn iter_from(&mut self, start: usize) -> impl Iterator<Item = Batch> + '_ {
        let per_epoch = self.batches_per_epoch();
        let batch_size = self.batch_size.get();
        let mut current: Option<(usize, Vec<usize>)> = None;

        (start..self.len()).map(move |i| {
            let (epoch, within) = (i / per_epoch, i % per_epoch);

            if current.as_ref().is_none_or(|(e, _)| *e != epoch) {
                current = Some((epoch, self.epoch_order(epoch)));
            }

            let order = current.as_ref().map(|(_, order)| order.as_slice()).unwrap_or_default();
            let lo = within * batch_size;
            let hi = (lo + batch_size).min(order.len());

            self.dataset.select(&order[lo..hi])
        })
    }
}
