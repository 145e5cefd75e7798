//! Parameter update rules and learning rate schedules.

mod scheduler;
mod sgd;

pub use scheduler::{WarmupMethod, WarmupMultiStepLr};
pub use sgd::Sgd;
