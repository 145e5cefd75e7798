use std::num::NonZeroUsize;

use ml_core::MlError;

/// The samples a rank draws from a dataset shared by the whole group.
///
/// Every rank gets `ceil(total / world_size)` samples. The visiting order is
/// padded by wrapping around to a multiple of the world size and then dealt
/// out round-robin, rank `r` taking positions `r, r + world_size, ..`. All
/// ranks therefore agree on the amount of batches, which keeps their
/// collectives in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSpec {
    rank: usize,
    world_size: NonZeroUsize,
}

impl ShardSpec {
    /// Creates a new `ShardSpec`.
    ///
    /// # Errors
    /// Returns `MlError::InvalidConfig` if `rank` is not below `world_size`.
    pub fn new(rank: usize, world_size: NonZeroUsize) -> Result<Self, MlError> {
        if rank >= world_size.get() {
            return Err(MlError::InvalidConfig(format!(
                "rank {rank} is out of range for world size {world_size}"
            )));
        }

        Ok(Self { rank, world_size })
    }

    /// The shard of a single process run: the whole dataset.
    pub fn whole() -> Self {
        Self {
            rank: 0,
            world_size: NonZeroUsize::MIN,
        }
    }

    #[inline]
    pub fn rank(self) -> usize {
        self.rank
    }

    #[inline]
    pub fn world_size(self) -> usize {
        self.world_size.get()
    }

    /// The amount of samples of this rank out of `total`, the same on every rank.
    #[inline]
    pub fn num_samples(self, total: usize) -> usize {
        total.div_ceil(self.world_size.get())
    }

    /// Picks this rank's part of a group-wide visiting `order`.
    ///
    /// # Returns
    /// Exactly `num_samples(order.len())` sample indices.
    pub fn take(self, order: &[usize]) -> Vec<usize> {
        let padded_len = self.num_samples(order.len()) * self.world_size.get();

        order
            .iter()
            .cycle()
            .take(padded_len)
            .skip(self.rank)
            .step_by(self.world_size.get())
            .copied()
            .collect()
    }
}
