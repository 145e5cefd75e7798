//! Windowed metric tracking for training and evaluation logs.

mod logger;
mod smoothed;

pub use logger::{MeterSummary, MetricLogger};
pub use smoothed::SmoothedValue;
