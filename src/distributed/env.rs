use std::{env, str::FromStr, time::Duration};

use log::info;

use super::{ProcessGroup, ROOT, SingleProcess, TcpGroup};
use crate::error::{Result, TrainErr};

const DEFAULT_MASTER_ADDR: &str = "127.0.0.1";
const DEFAULT_MASTER_PORT: u16 = 29500;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where this process sits in a distributed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedConfig {
    pub rank: usize,
    pub world_size: usize,
    pub master_addr: String,
    pub master_port: u16,
    pub connect_timeout: Duration,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            rank: ROOT,
            world_size: 1,
            master_addr: DEFAULT_MASTER_ADDR.to_string(),
            master_port: DEFAULT_MASTER_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl DistributedConfig {
    /// Reads `RANK`, `WORLD_SIZE`, `MASTER_ADDR`, `MASTER_PORT` and
    /// `CONNECT_TIMEOUT_SECS` from the environment, missing ones take their
    /// default value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cfg = Self {
            rank: parse_var(&lookup, "RANK")?.unwrap_or(defaults.rank),
            world_size: parse_var(&lookup, "WORLD_SIZE")?.unwrap_or(defaults.world_size),
            master_addr: lookup("MASTER_ADDR").unwrap_or(defaults.master_addr),
            master_port: parse_var(&lookup, "MASTER_PORT")?.unwrap_or(defaults.master_port),
            connect_timeout: parse_var(&lookup, "CONNECT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.world_size == 0 {
            return Err(TrainErr::Config("WORLD_SIZE must be at least 1".into()));
        }

        if self.rank >= self.world_size {
            return Err(TrainErr::InvalidRank {
                rank: self.rank,
                world_size: self.world_size,
            });
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| TrainErr::Config(format!("{key} has an invalid value {raw:?}")))
}

/// The process group of a run, chosen at startup.
pub enum Group {
    Single(SingleProcess),
    Tcp(TcpGroup),
}

/// Sets up the process group described by `cfg`.
///
/// A world of size 1 never touches the network. Otherwise rank 0 listens at
/// `master_addr:master_port` and the other ranks connect to it.
pub async fn init_process_group(cfg: &DistributedConfig) -> Result<Group> {
    cfg.validate()?;

    if cfg.world_size == 1 {
        return Ok(Group::Single(SingleProcess));
    }

    let addr = (cfg.master_addr.as_str(), cfg.master_port);
    let group = if cfg.rank == ROOT {
        TcpGroup::bind(addr, cfg.world_size).await?
    } else {
        TcpGroup::connect(addr, cfg.rank, cfg.world_size, cfg.connect_timeout).await?
    };

    info!(rank = cfg.rank, world_size = cfg.world_size; "process group ready");
    Ok(Group::Tcp(group))
}

impl ProcessGroup for Group {
    fn rank(&self) -> usize {
        match self {
            Group::Single(g) => g.rank(),
            Group::Tcp(g) => g.rank(),
        }
    }

    fn world_size(&self) -> usize {
        match self {
            Group::Single(g) => g.world_size(),
            Group::Tcp(g) => g.world_size(),
        }
    }

    async fn reduce(&mut self, values: &mut [f32], dst: usize) -> Result<()> {
        match self {
            Group::Single(g) => g.reduce(values, dst).await,
            Group::Tcp(g) => g.reduce(values, dst).await,
        }
    }
}
