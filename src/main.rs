//! Trains `LinearRegression` on synthetic data, one process per rank.
//!
//! Only the losses are averaged across ranks, for logging. Gradients are not,
//! so every rank fits its own model on its own shard and `ims_per_batch` is a
//! global batch in name only: the sum of the per-rank batch sizes.

use anyhow::Context;
use distributed_trainer::{
    Arguments, DistributedConfig, ProcessGroup, TrainConfig, Trainer,
    data::{InMemoryDataLoader, ShardSpec, synthetic::LinearTask},
    distributed::ROOT,
    init_process_group,
    models::LinearRegression,
};
use log::info;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = TrainConfig::load()?;
    let dist = DistributedConfig::from_env()?;
    let device = cfg.device()?;
    let batch_size = cfg.batch_per_rank(dist.world_size)?;

    let group = init_process_group(&dist)
        .await
        .context("failed to set up the process group")?;
    let rank = group.rank();
    let shard = ShardSpec::new(rank, group.world_size().try_into()?)?;

    // Same seed everywhere, every rank sees the same data and keeps its shard.
    let mut rng = StdRng::seed_from_u64(cfg.data.seed);
    let task = LinearTask::random(cfg.data.num_features, cfg.data.noise, &mut rng)?;
    let train_set = task.sample(cfg.data.num_train, &mut rng)?;
    let test_set = task.sample(cfg.data.num_test, &mut rng)?;

    let mut train_loader = InMemoryDataLoader::iteration_based(
        train_set,
        shard,
        batch_size,
        cfg.solver.max_iter,
        cfg.data.seed,
    );
    let mut test_loader = InMemoryDataLoader::sequential(test_set, shard, batch_size);

    let mut arguments = Arguments::default();
    let model = LinearRegression::new(cfg.data.num_features);
    let optimizer = cfg.optimizer(model.num_params());
    let scheduler = cfg.scheduler(arguments.iteration)?;

    let max_iter = cfg.solver.max_iter;
    info!(rank = rank; "training on {device}: batch_size={batch_size} max_iter={max_iter}");

    let mut trainer = Trainer::new(model, optimizer, scheduler, group, device)
        .with_log_period(cfg.log_period);

    let report = tokio::select! {
        ret = trainer.train(&mut train_loader, &mut test_loader, &mut arguments) => ret?,
        _ = signal::ctrl_c() => {
            info!(rank = rank; "received SIGTERM");
            return Ok(());
        }
    };

    let model = trainer.model();
    let weight_err = (&model.weights() - task.weights())
        .mapv(f32::abs)
        .fold(0.0f32, |a, &b| a.max(b));
    info!(
        rank = rank;
        "max weight error {weight_err:.4}, bias error {:.4}",
        (model.bias() - task.bias()).abs()
    );

    if rank == ROOT {
        let summary = json!({
            "arguments": arguments,
            "skipped_train": report.skipped_train,
            "skipped_test": report.skipped_test,
            "total_time_secs": report.total_time.as_secs_f64(),
            "train": report.train_meters.summary(),
            "test": report.test_meters.summary(),
        });

        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
