use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use ml_core::{DataLoader, Device, LossDict, LrScheduler, Model, Optimizer, ToDevice};

use super::{Arguments, reduce_loss_dict};
use crate::{
    distributed::ProcessGroup,
    error::{Result, TrainErr},
    metrics::MetricLogger,
};

/// Training iterations between two meter logs.
pub const DEFAULT_LOG_PERIOD: usize = 10;

const LOSS: &str = "loss";
const TIME: &str = "time";
const DATA: &str = "data";

/// Meter names the loop fills itself, no loss component may use them.
const RESERVED: [&str; 3] = [LOSS, TIME, DATA];

/// The outcome of a training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// `loss`, every reduced loss component, `time` and `data`.
    pub train_meters: MetricLogger,
    /// `loss` and every reduced loss component.
    pub test_meters: MetricLogger,
    /// Training batches whose forward pass failed.
    pub skipped_train: usize,
    /// Test batches whose forward pass failed.
    pub skipped_test: usize,
    pub total_time: Duration,
}

/// Drives a model through a training phase followed by an evaluation phase.
pub struct Trainer<M, O, S, G> {
    model: M,
    optimizer: O,
    scheduler: S,
    group: G,
    device: Device,
    log_period: usize,
}

impl<M, O, S, G> Trainer<M, O, S, G>
where
    M: Model,
    M::Batch: ToDevice,
    O: Optimizer,
    S: LrScheduler,
    G: ProcessGroup,
{
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `optimizer` - Updates the model's parameters from its gradients.
    /// * `scheduler` - Sets the learning rate of every iteration.
    /// * `group` - The processes the losses are averaged across.
    /// * `device` - Where every batch is moved before the forward pass.
    pub fn new(model: M, optimizer: O, scheduler: S, group: G, device: Device) -> Self {
        Self {
            model,
            optimizer,
            scheduler,
            group,
            device,
            log_period: DEFAULT_LOG_PERIOD,
        }
    }

    pub fn with_log_period(mut self, log_period: NonZeroUsize) -> Self {
        self.log_period = log_period.get();
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn group(&self) -> &G {
        &self.group
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Trains on every remaining batch of `train_loader`, then evaluates on
    /// every batch of `test_loader`.
    ///
    /// Training resumes at `arguments.iteration`, which is updated at every
    /// iteration. A batch whose forward pass fails is skipped and counted.
    /// The model stays in training mode for the evaluation, the forward pass
    /// is what reports the losses.
    ///
    /// # Errors
    /// Returns `TrainErr` if moving a batch, the backward pass, the optimizer
    /// step or a collective fails, or if a loss component is named `loss`,
    /// `time` or `data`.
    pub async fn train<L, T>(
        &mut self,
        train_loader: &mut L,
        test_loader: &mut T,
        arguments: &mut Arguments,
    ) -> Result<TrainReport>
    where
        L: DataLoader<Batch = M::Batch>,
        T: DataLoader<Batch = M::Batch>,
    {
        let mut run = Run {
            model: &mut self.model,
            optimizer: &mut self.optimizer,
            scheduler: &mut self.scheduler,
            group: &mut self.group,
            device: self.device,
            log_period: self.log_period,
        };

        run.execute(train_loader, test_loader, arguments).await
    }
}

/// Runs the training and evaluation phases over borrowed components.
///
/// # Returns
/// The train and test meters.
///
/// # Errors
/// Same as `Trainer::train`.
#[allow(clippy::too_many_arguments)]
pub async fn do_train<M, L, T, O, S, G>(
    model: &mut M,
    train_loader: &mut L,
    test_loader: &mut T,
    optimizer: &mut O,
    scheduler: &mut S,
    group: &mut G,
    device: Device,
    arguments: &mut Arguments,
) -> Result<(MetricLogger, MetricLogger)>
where
    M: Model,
    M::Batch: ToDevice,
    L: DataLoader<Batch = M::Batch>,
    T: DataLoader<Batch = M::Batch>,
    O: Optimizer,
    S: LrScheduler,
    G: ProcessGroup,
{
    let mut run = Run {
        model,
        optimizer,
        scheduler,
        group,
        device,
        log_period: DEFAULT_LOG_PERIOD,
    };

    let report = run.execute(train_loader, test_loader, arguments).await?;
    Ok((report.train_meters, report.test_meters))
}

struct Run<'a, M, O, S, G> {
    model: &'a mut M,
    optimizer: &'a mut O,
    scheduler: &'a mut S,
    group: &'a mut G,
    device: Device,
    log_period: usize,
}

impl<M, O, S, G> Run<'_, M, O, S, G>
where
    M: Model,
    M::Batch: ToDevice,
    O: Optimizer,
    S: LrScheduler,
    G: ProcessGroup,
{
    async fn execute<L, T>(
        &mut self,
        train_loader: &mut L,
        test_loader: &mut T,
        arguments: &mut Arguments,
    ) -> Result<TrainReport>
    where
        L: DataLoader<Batch = M::Batch>,
        T: DataLoader<Batch = M::Batch>,
    {
        let rank = self.group.rank();
        let max_iter = train_loader.len();
        let start_iter = arguments.iteration;
        debug!(rank = rank; "start training: start_iter={start_iter} max_iter={max_iter}");

        let start = Instant::now();
        let (train_meters, skipped_train) =
            self.train_phase(train_loader, arguments, max_iter).await?;
        let (test_meters, skipped_test) = self.test_phase(test_loader).await?;
        let total_time = start.elapsed();

        let per_iter = match max_iter {
            0 => 0.0,
            n => total_time.as_secs_f64() / n as f64,
        };

        info!(
            rank = rank;
            "total training time: {} ({per_iter:.4} s / it)",
            format_duration(total_time)
        );

        Ok(TrainReport {
            train_meters,
            test_meters,
            skipped_train,
            skipped_test,
            total_time,
        })
    }

    async fn train_phase<L>(
        &mut self,
        loader: &mut L,
        arguments: &mut Arguments,
        max_iter: usize,
    ) -> Result<(MetricLogger, usize)>
    where
        L: DataLoader<Batch = M::Batch>,
    {
        let rank = self.group.rank();
        let start_iter = arguments.iteration;
        let mut meters = MetricLogger::default();
        let mut skipped = 0;

        self.model.train();
        let mut end = Instant::now();

        for (index, batch) in (start_iter..).zip(loader.iter_from(start_iter)) {
            let data_time = end.elapsed();
            let iteration = index + 1;
            arguments.iteration = iteration;

            let lr = self.scheduler.step();
            self.optimizer.set_learning_rate(lr);

            let batch = batch.to_device(self.device)?;
            let loss_dict = match self.model.forward(&batch) {
                Ok(loss_dict) => loss_dict,
                Err(e) => {
                    warn!(rank = rank, iteration = iteration; "skipping training batch: {e}");
                    skipped += 1;
                    end = Instant::now();
                    continue;
                }
            };
            check_names(&loss_dict)?;

            let reduced = reduce_loss_dict(&loss_dict, &mut *self.group).await?;
            meters.update(LOSS, reduced.total());
            meters.update_all(reduced.iter());

            self.model.zero_grad();
            self.model.backward()?;
            let (params, grads) = self.model.params_and_grads();
            self.optimizer.step(params, grads)?;

            meters.update(TIME, end.elapsed().as_secs_f32());
            meters.update(DATA, data_time.as_secs_f32());
            end = Instant::now();

            if iteration % self.log_period == 0 || iteration == max_iter {
                let eta = meters
                    .get(TIME)
                    .map(|time| time.global_avg() as f64 * (max_iter - iteration) as f64)
                    .unwrap_or_default();

                info!(
                    rank = rank;
                    "eta: {}{d}iter: {iteration}{d}{meters}{d}lr: {lr:.6}",
                    format_duration(Duration::from_secs(eta as u64)),
                    d = meters.delimiter(),
                );
            }
        }

        Ok((meters, skipped))
    }

    async fn test_phase<T>(&mut self, loader: &mut T) -> Result<(MetricLogger, usize)>
    where
        T: DataLoader<Batch = M::Batch>,
    {
        let rank = self.group.rank();
        let mut meters = MetricLogger::default();
        let mut skipped = 0;

        for batch in loader.iter_from(0) {
            let batch = batch.to_device(self.device)?;
            let loss_dict = match self.model.forward(&batch) {
                Ok(loss_dict) => loss_dict,
                Err(e) => {
                    warn!(rank = rank; "skipping test batch: {e}");
                    skipped += 1;
                    continue;
                }
            };
            check_names(&loss_dict)?;

            let reduced = reduce_loss_dict(&loss_dict, &mut *self.group).await?;
            meters.update(LOSS, reduced.total());
            meters.update_all(reduced.iter());
        }

        info!(rank = rank; "Test: {meters}");
        Ok((meters, skipped))
    }
}

fn check_names(loss_dict: &LossDict) -> Result<()> {
    match loss_dict.names().find(|name| RESERVED.contains(name)) {
        Some(name) => Err(TrainErr::ReservedMeterName(name.to_string())),
        None => Ok(()),
    }
}

/// Formats a duration as `H:MM:SS[.ffffff]`, prefixed by `N day(s), ` past a day.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let micros = duration.subsec_micros();

    let (days, secs) = (secs / 86_400, secs % 86_400);
    let (hours, minutes, secs) = (secs / 3600, secs % 3600 / 60, secs % 60);

    let mut out = match days {
        0 => String::new(),
        1 => "1 day, ".to_string(),
        n => format!("{n} days, "),
    };

    out.push_str(&format!("{hours}:{minutes:02}:{secs:02}"));
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }

    out
}
