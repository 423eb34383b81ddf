//! `cartsync once`: a single pass, printed.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use cartsync_core::{Side, SyncMode};
use cartsync_sync::{ItemChange, ItemOp, PassReport, SyncEngine};

use super::Context;

/// Arguments for `cartsync once`.
#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Override `sync_mode` for this pass.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SyncMode>,

    /// Compute the pass without touching either list or the baseline.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the pass report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl OnceArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let report = run_single_pass(ctx, self.mode, self.dry_run)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

/// Connect both sides and run one pass.
pub(crate) fn run_single_pass(
    ctx: &Context,
    mode: Option<SyncMode>,
    dry_run: bool,
) -> Result<PassReport> {
    let config = ctx.load_config_with_mode(mode)?;
    let mut engine =
        SyncEngine::connect(&config, &ctx.home).context("failed to connect to list services")?;
    engine.run_pass(dry_run).context("sync pass failed")
}

pub(crate) fn print_report(report: &PassReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let mut flags = vec![report.mode.to_string()];
    if report.seeded {
        flags.push("seeded".to_string());
    }

    if report.is_noop() {
        println!(
            "{prefix}✓ Lists already in sync ({}, {} items)",
            flags.join(", "),
            report.baseline.len()
        );
    } else {
        println!(
            "{prefix}✓ Pass complete ({}) in {} ms",
            flags.join(", "),
            report.duration_ms
        );
    }

    for side in Side::all() {
        let side_report = report.side(*side);
        if side_report.is_noop() {
            continue;
        }
        println!(
            "  {} '{}': +{} -{}",
            side,
            side_report.list,
            side_report.added(),
            side_report.removed()
        );
        for change in &side_report.changes {
            match change {
                ItemChange::Added { item } | ItemChange::WouldAdd { item } => {
                    println!("    {} {}", "+".green().bold(), item)
                }
                ItemChange::Removed { item } | ItemChange::WouldRemove { item } => {
                    println!("    {} {}", "-".red().bold(), item)
                }
            }
        }
        for failure in &side_report.failures {
            let op = match failure.op {
                ItemOp::Add => "add",
                ItemOp::Remove => "remove",
            };
            println!(
                "    {} could not {} '{}': {}",
                "!".yellow().bold(),
                op,
                failure.item,
                failure.reason
            );
        }
    }

    if !report.dry_run && !report.baseline_saved {
        println!(
            "  {} baseline was not saved; the next pass will compare against the previous one",
            "!".yellow().bold()
        );
    }
}
