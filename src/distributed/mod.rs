//! Process groups: the collective backend used to reduce losses across workers.

mod env;
mod group;
mod single;
mod star;

pub use env::{DistributedConfig, Group, init_process_group};
pub use group::{ProcessGroup, ProcessGroupTemplate, ROOT};
pub use single::SingleProcess;
pub use star::{StarGroup, TcpGroup};
