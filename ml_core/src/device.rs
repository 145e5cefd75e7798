use std::{fmt, str::FromStr};

use ndarray::{Array, Dimension};

use crate::MlError;

/// Where the tensors of a computation live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

impl FromStr for Device {
    type Err = MlError;

    /// Parses `cpu`, `cuda` (ordinal 0) and `cuda:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("cpu") => Ok(Device::Cpu),
            None if s.eq_ignore_ascii_case("cuda") => Ok(Device::Cuda(0)),
            Some((kind, ordinal)) if kind.eq_ignore_ascii_case("cuda") => ordinal
                .parse()
                .map(Device::Cuda)
                .map_err(|_| MlError::InvalidConfig(format!("invalid device ordinal in {s:?}"))),
            _ => Err(MlError::InvalidConfig(format!("unknown device {s:?}"))),
        }
    }
}

/// Data that can be moved to a `Device`.
pub trait ToDevice: Sized {
    /// Moves `self` to `device`.
    ///
    /// # Errors
    /// Returns `MlError::UnsupportedDevice` if the data cannot live on `device`.
    fn to_device(self, device: Device) -> Result<Self, MlError>;
}

/// Owned ndarray arrays live in host memory.
impl<A, D: Dimension> ToDevice for Array<A, D> {
    fn to_device(self, device: Device) -> Result<Self, MlError> {
        match device {
            Device::Cpu => Ok(self),
            other => Err(MlError::UnsupportedDevice(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn parses_device_strings() {
        assert_eq!("cpu".parse::<Device>(), Ok(Device::Cpu));
        assert_eq!("CUDA".parse::<Device>(), Ok(Device::Cuda(0)));
        assert_eq!("cuda:3".parse::<Device>(), Ok(Device::Cuda(3)));
        assert!("cuda:x".parse::<Device>().is_err());
        assert!("tpu".parse::<Device>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for device in [Device::Cpu, Device::Cuda(1)] {
            assert_eq!(device.to_string().parse::<Device>(), Ok(device));
        }
    }

    #[test]
    fn host_arrays_only_move_to_cpu() {
        let x = array![[1.0f32, 2.0]];
        assert_eq!(x.clone().to_device(Device::Cpu), Ok(x.clone()));
        assert_eq!(
            x.to_device(Device::Cuda(0)),
            Err(MlError::UnsupportedDevice("cuda:0".into()))
        );
    }
}
