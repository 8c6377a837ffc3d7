use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rand::Rng;
use tokio::task::JoinHandle;

pub const TICK_INTERVAL: Duration = Duration::from_millis(200);
pub const MAX_STEP: f64 = 15.0;
pub const CEILING: f64 = 90.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulatedProgress {
    value: f64,
}

impl SimulatedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn percent(&self) -> u64 {
        self.value.round() as u64
    }

    pub fn advance(&mut self, step: f64) -> f64 {
        self.value = (self.value + step.max(0.0)).min(CEILING);
        self.value
    }

    pub fn advance_random<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let step = rng.gen_range(0.0..MAX_STEP);
        self.advance(step)
    }
}

pub struct ProgressTicker {
    pb: ProgressBar,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn start(label: &str, hidden: bool) -> Self {
        let pb = ProgressBar::new(100);
        if hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            pb.set_draw_target(ProgressDrawTarget::stderr());
        }
        if let Ok(style) =
            ProgressStyle::with_template(":: {msg} [{bar:30}] {pos}% :: [{elapsed_precise}]")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(label.to_string());

        let bar = pb.clone();
        let handle = tokio::spawn(async move {
            let mut progress = SimulatedProgress::new();
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                progress.advance_random(&mut rand::thread_rng());
                bar.set_position(progress.percent());
            }
        });
        Self { pb, handle }
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish(self, message: &str) {
        self.handle.abort();
        self.pb.set_position(100);
        self.pb.finish_with_message(message.to_string());
    }

    pub fn abandon(self) {
        self.handle.abort();
        self.pb.finish_and_clear();
    }
}
