//! The training/evaluation driver and its distributed loss reduction.

mod arguments;
mod reduce;
mod trainer;

pub use arguments::Arguments;
pub use reduce::reduce_loss_dict;
pub use trainer::{DEFAULT_LOG_PERIOD, TrainReport, Trainer, do_train};
