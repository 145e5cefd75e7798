#![allow(dead_code)]

use comms::{OnoReceiver, OnoSender};
use distributed_trainer::distributed::StarGroup;
use futures::future::try_join_all;
use ml_core::{DataLoader, Device, LossDict, MlError, Model, ToDevice};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

pub type DuplexGroup = StarGroup<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

type DuplexChannel = (
    OnoReceiver<ReadHalf<DuplexStream>>,
    OnoSender<WriteHalf<DuplexStream>>,
);

fn link() -> (DuplexChannel, DuplexChannel) {
    let (a, b) = io::duplex(4096);
    let (a_rx, a_tx) = io::split(a);
    let (b_rx, b_tx) = io::split(b);
    (comms::channel(a_rx, a_tx), comms::channel(b_rx, b_tx))
}

/// Builds every rank of an in-memory star group, indexed by rank.
pub async fn star(world_size: usize) -> Vec<DuplexGroup> {
    let (root_ends, peer_ends): (Vec<_>, Vec<_>) = (1..world_size).map(|_| link()).unzip();

    let root = DuplexGroup::coordinate(world_size, root_ends);
    let peers = try_join_all(
        peer_ends
            .into_iter()
            .enumerate()
            .map(|(i, (rx, tx))| DuplexGroup::join(i + 1, world_size, rx, tx)),
    );

    let (root, peers) = tokio::try_join!(root, peers).unwrap();
    std::iter::once(root).chain(peers).collect()
}

/// A batch telling `ScriptedModel` what to report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub loss: f32,
    pub fail: bool,
}

impl Step {
    pub fn ok(loss: f32) -> Self {
        Self { loss, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            loss: f32::NAN,
            fail: true,
        }
    }
}

impl ToDevice for Step {
    fn to_device(self, device: Device) -> Result<Self, MlError> {
        match device {
            Device::Cpu => Ok(self),
            other => Err(MlError::UnsupportedDevice(other.to_string())),
        }
    }
}

/// A model with a single parameter reporting `{loss_a: loss, loss_b: 2 * loss}`.
///
/// Like detection models, it only reports losses in training mode.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    pub training: bool,
    /// Also reported, with the value of `loss_a`.
    pub extra_component: Option<&'static str>,
    pub forwards: usize,
    pub backwards: usize,
    pub params: [f32; 1],
    pub grads: [f32; 1],
}

impl Model for ScriptedModel {
    type Batch = Step;

    fn train(&mut self) {
        self.training = true;
    }

    fn eval(&mut self) {
        self.training = false;
    }

    fn forward(&mut self, step: &Step) -> Result<LossDict, MlError> {
        self.forwards += 1;

        if !self.training {
            return Err(MlError::InvalidInput("losses are only computed in training mode"));
        }

        if step.fail {
            return Err(MlError::InvalidInput("scripted failure"));
        }

        let mut losses: LossDict =
            [("loss_b", 2.0 * step.loss), ("loss_a", step.loss)].into_iter().collect();
        if let Some(name) = self.extra_component {
            losses.insert(name, step.loss);
        }

        Ok(losses)
    }

    fn zero_grad(&mut self) {
        self.grads = [0.0];
    }

    fn backward(&mut self) -> Result<(), MlError> {
        self.backwards += 1;
        self.grads[0] += 1.0;
        Ok(())
    }

    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params, &self.grads)
    }
}

impl ScriptedModel {
    pub fn param(&self) -> f32 {
        self.params[0]
    }
}

/// A loader over a fixed list of batches.
pub struct VecLoader<T>(pub Vec<T>);

impl<T: Clone> DataLoader for VecLoader<T> {
    type Batch = T;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn iter_from(&mut self, start: usize) -> impl Iterator<Item = T> + '_ {
        self.0.iter().skip(start).cloned()
    }
}
