//! `cartsync init`

use anyhow::{Context as _, Result};
use clap::Args;

use cartsync_core::config;

use super::Context;

/// Write a starter config.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let (path, created) = config::init_at(&ctx.home).context("failed to write config")?;
        if created {
            println!("✓ Wrote starter config to {}", path.display());
            println!("  Edit the note and shopping sections, then run `cartsync once --dry-run`.");
        } else {
            println!("Config already exists at {}; left untouched.", path.display());
        }
        Ok(())
    }
}
