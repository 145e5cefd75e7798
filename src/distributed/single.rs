use super::{ProcessGroup, ROOT};
use crate::error::{Result, TrainErr};

/// The group of a non distributed run: a single process of rank 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl ProcessGroup for SingleProcess {
    fn rank(&self) -> usize {
        ROOT
    }

    fn world_size(&self) -> usize {
        1
    }

    async fn reduce(&mut self, _values: &mut [f32], dst: usize) -> Result<()> {
        if dst != ROOT {
            return Err(TrainErr::InvalidRank {
                rank: dst,
                world_size: 1,
            });
        }

        Ok(())
    }
}
