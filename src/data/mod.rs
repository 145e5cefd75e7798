//! In-memory datasets and the loaders feeding them to the training loop.

mod dataloader;
mod dataset;
mod shard;
pub mod synthetic;

pub use dataloader::InMemoryDataLoader;
pub use dataset::{Batch, InMemoryDataset};
pub use shard::ShardSpec;
