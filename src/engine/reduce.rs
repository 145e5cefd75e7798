use log::debug;
use ml_core::LossDict;

use crate::{
    distributed::{ProcessGroup, ROOT},
    error::Result,
};

/// Averages a loss dict across the process group, for logging purposes.
///
/// The values are stacked by sorted name and reduced (summed) to rank 0 in a
/// single collective. Only rank 0 divides by the world size and so holds the
/// average, every other rank gets back its own values.
///
/// # Arguments
/// * `loss_dict` - This rank's loss components.
/// * `group` - The process group to reduce over.
///
/// # Returns
/// A loss dict with the same names, or the input unchanged when there are
/// less than two processes.
pub async fn reduce_loss_dict<G: ProcessGroup>(
    loss_dict: &LossDict,
    group: &mut G,
) -> Result<LossDict> {
    let world_size = group.world_size();
    if world_size < 2 {
        return Ok(loss_dict.clone());
    }

    let mut values: Vec<f32> = loss_dict.values().collect();
    group.reduce(&mut values, ROOT).await?;

    if group.rank() == ROOT {
        let scale = world_size as f32;
        values.iter_mut().for_each(|v| *v /= scale);
    }

    debug!(rank = group.rank(), components = values.len(); "reduced loss dict");
    Ok(loss_dict.names().zip(values).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::SingleProcess;

    #[tokio::test]
    async fn single_process_returns_the_input() {
        let losses: LossDict = [("loss_b", 2.0), ("loss_a", 1.0)].into_iter().collect();

        let reduced = reduce_loss_dict(&losses, &mut SingleProcess).await.unwrap();
        assert_eq!(reduced, losses);
    }
}
