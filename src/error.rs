use std::{error::Error, fmt, io};

use ml_core::MlError;

/// The engine's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Failures of a training run.
#[derive(Debug)]
pub enum TrainErr {
    Io(io::Error),
    Ml(MlError),
    Config(String),
    /// A peer broke the collective protocol or reported an error.
    Protocol {
        rank: usize,
        msg: String,
    },
    /// Two ranks contributed vectors of different lengths to a collective.
    LengthMismatch {
        rank: usize,
        got: usize,
        expected: usize,
    },
    /// A model reported a loss component under a name the loop uses itself.
    ReservedMeterName(String),
    /// A collective addressed a rank outside the group.
    InvalidRank {
        rank: usize,
        world_size: usize,
    },
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::Io(e) => write!(f, "io error: {e}"),
            TrainErr::Ml(e) => write!(f, "ml error: {e}"),
            TrainErr::Config(msg) => write!(f, "invalid config: {msg}"),
            TrainErr::Protocol { rank, msg } => {
                write!(f, "protocol error with rank {rank}: {msg}")
            }
            TrainErr::LengthMismatch {
                rank,
                got,
                expected,
            } => write!(
                f,
                "rank {rank} contributed {got} values to a collective, expected {expected}"
            ),
            TrainErr::ReservedMeterName(name) => {
                write!(f, "loss component {name:?} clashes with a meter of the training loop")
            }
            TrainErr::InvalidRank { rank, world_size } => {
                write!(f, "rank {rank} is out of range for world size {world_size}")
            }
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Io(e) => Some(e),
            TrainErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlError> for TrainErr {
    fn from(value: MlError) -> Self {
        Self::Ml(value)
    }
}
