mod data;
mod device;
mod error;
mod loss;
mod model;
mod optimizer;

pub use data::DataLoader;
pub use device::{Device, ToDevice};
pub use error::MlError;
pub use loss::LossDict;
pub use model::Model;
pub use optimizer::{LrScheduler, Optimizer};
