//! `cartsync run`: the long-running scheduler.

use anyhow::{Context as _, Result};
use clap::Args;

use cartsync_core::SyncMode;

use super::Context;

/// Arguments for `cartsync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override `sync_mode` (bidirectional, mirror_from_note, mirror_from_shopping).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SyncMode>,

    /// Override `interval_minutes`; 0 runs one pass and exits.
    #[arg(long, value_name = "MINUTES")]
    pub interval: Option<u64>,
}

impl RunArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let mut config = ctx.load_config_with_mode(self.mode)?;
        if let Some(minutes) = self.interval {
            config.interval_minutes = minutes;
            config.validate().context("invalid --interval")?;
        }

        let stats = cartsync_daemon::start_blocking(&ctx.home, config)
            .context("sync service stopped with an error")?;

        println!(
            "✓ Stopped after {} passes ({} failed, {} ticks skipped)",
            stats.passes_started, stats.passes_failed, stats.ticks_dropped
        );
        Ok(())
    }
}
