mod common;

use std::{
    num::NonZeroUsize,
    sync::{Mutex, OnceLock},
};

use distributed_trainer::{
    Arguments, Trainer,
    distributed::SingleProcess,
    optim::{Sgd, WarmupMethod, WarmupMultiStepLr},
};
use log::{Level, LevelFilter, Log, Metadata, Record};
use ml_core::Device;

use common::{ScriptedModel, Step, VecLoader};

/// Keeps every `info` message of the engine.
struct Capture(Mutex<Vec<String>>);

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) && record.target().starts_with("distributed_trainer") {
            self.0.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn capture() -> &'static Capture {
    static CAPTURE: OnceLock<&'static Capture> = OnceLock::new();

    CAPTURE.get_or_init(|| {
        let capture: &'static Capture = Box::leak(Box::new(Capture(Mutex::new(Vec::new()))));
        log::set_logger(capture).unwrap();
        log::set_max_level(LevelFilter::Info);
        capture
    })
}

/// The iterations of the periodic meter logs.
fn logged_iterations(messages: &[String]) -> Vec<usize> {
    messages
        .iter()
        .filter(|msg| msg.starts_with("eta: "))
        .filter_map(|msg| msg.split("iter: ").nth(1)?.split_whitespace().next()?.parse().ok())
        .collect()
}

#[tokio::test]
async fn meters_are_logged_every_period_and_at_the_end() {
    let capture = capture();

    let scheduler =
        WarmupMultiStepLr::new(0.1, vec![], 0.1, 1.0, 0, WarmupMethod::Constant).unwrap();
    let mut trainer = Trainer::new(
        ScriptedModel::default(),
        Sgd::new(1, 0.1, 0.0, 0.0),
        scheduler,
        SingleProcess,
        Device::Cpu,
    )
    .with_log_period(NonZeroUsize::new(4).unwrap());

    // iteration 8 fails and is not logged, the last one is always logged
    let mut steps: Vec<_> = (0..10).map(|i| Step::ok(i as f32)).collect();
    steps[7] = Step::failing();

    let mut train = VecLoader(steps);
    let mut test = VecLoader(vec![Step::ok(1.0)]);
    let mut arguments = Arguments::default();

    trainer.train(&mut train, &mut test, &mut arguments).await.unwrap();
    assert_eq!(arguments.iteration, 10);

    let messages = capture.0.lock().unwrap().clone();
    assert_eq!(logged_iterations(&messages), [4, 10]);

    assert!(messages.iter().any(|msg| msg.starts_with("Test: loss: ")));
    assert!(messages.iter().any(|msg| msg.starts_with("total training time: ")));
}
