//! A training/evaluation driver whose losses are averaged across a group of
//! cooperating worker processes for logging.

pub mod config;
pub mod data;
pub mod distributed;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod optim;

pub use config::TrainConfig;
pub use distributed::{DistributedConfig, ProcessGroup, init_process_group};
pub use engine::{Arguments, TrainReport, Trainer, do_train, reduce_loss_dict};
pub use error::{Result, TrainErr};
pub use metrics::MetricLogger;
