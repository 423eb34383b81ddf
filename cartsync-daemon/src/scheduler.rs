//! Interval driver for sync passes.
//!
//! One pass runs immediately. After that a pass starts on every interval
//! tick, unless one is still in flight: such ticks are dropped, never
//! queued. A shutdown signal stops the loop between passes; an in-flight
//! pass always runs to completion first.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::DaemonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Counters reported when the scheduler returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub passes_started: u64,
    pub passes_failed: u64,
    pub ticks_dropped: u64,
}

#[derive(Debug)]
pub struct Scheduler {
    interval: Option<Duration>,
    state: SchedulerState,
    stats: SchedulerStats,
}

impl Scheduler {
    /// `None` (or a zero duration) runs exactly one pass.
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|period| !period.is_zero()),
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Drive `pass` until shutdown, or once when there is no interval.
    ///
    /// The first pass failing is returned as an error. Later failures are
    /// logged and counted.
    pub async fn run<F, Fut>(
        &mut self,
        mut pass: F,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<SchedulerStats, DaemonError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), DaemonError>> + Send + 'static,
    {
        self.begin();
        let first = pass().await;
        self.finish(&first);
        first?;

        let Some(period) = self.interval else {
            tracing::info!("no interval configured; exiting after one pass");
            return Ok(self.stats);
        };
        tracing::info!(interval_secs = period.as_secs(), "scheduler started");

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let (done_tx, mut done_rx) = mpsc::channel::<Result<(), DaemonError>>(1);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if self.state == SchedulerState::Running {
                        self.stats.ticks_dropped += 1;
                        tracing::warn!("previous pass still running; skipping this tick");
                        continue;
                    }
                    self.begin();
                    spawn_pass(pass(), done_tx.clone());
                }
                Some(result) = done_rx.recv() => {
                    self.finish(&result);
                }
            }
        }

        if self.state == SchedulerState::Running {
            tracing::info!("waiting for the running pass to finish");
            if let Some(result) = done_rx.recv().await {
                self.finish(&result);
            }
        }

        tracing::info!(
            passes_started = self.stats.passes_started,
            passes_failed = self.stats.passes_failed,
            ticks_dropped = self.stats.ticks_dropped,
            "scheduler stopped"
        );
        Ok(self.stats)
    }

    fn begin(&mut self) {
        self.state = SchedulerState::Running;
        self.stats.passes_started += 1;
    }

    fn finish(&mut self, result: &Result<(), DaemonError>) {
        self.state = SchedulerState::Idle;
        if let Err(err) = result {
            self.stats.passes_failed += 1;
            tracing::error!(error = %err, "sync pass failed");
        }
    }
}

/// Run `pass` on its own task and report the result, including panics.
fn spawn_pass<Fut>(pass: Fut, done: mpsc::Sender<Result<(), DaemonError>>)
where
    Fut: Future<Output = Result<(), DaemonError>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = match tokio::spawn(pass).await {
            Ok(result) => result,
            Err(err) => Err(DaemonError::Join("sync pass", err.to_string())),
        };
        let _ = done.send(result).await;
    });
}
