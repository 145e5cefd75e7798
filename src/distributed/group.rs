use crate::error::Result;

/// The rank that coordinates collectives.
pub const ROOT: usize = 0;

/// A set of cooperating worker processes able to run collectives.
#[trait_variant::make(ProcessGroup: Send)]
pub trait ProcessGroupTemplate {
    /// The rank of this process, in `0..world_size`.
    fn rank(&self) -> usize;

    /// The amount of processes in the group.
    fn world_size(&self) -> usize;

    /// Sums `values` element-wise across every rank and leaves the result in
    /// rank `dst`'s buffer. Blocks until this rank's part of the collective is done.
    ///
    /// The contents of `values` on ranks other than `dst` are unspecified
    /// after the call.
    ///
    /// # Arguments
    /// * `values` - This rank's contribution, same length on every rank.
    /// * `dst` - The rank receiving the sum.
    ///
    /// # Returns
    /// An error if `dst` is out of range, the ranks disagree on the length or a
    /// link fails.
    async fn reduce(&mut self, values: &mut [f32], dst: usize) -> Result<()>;
}
