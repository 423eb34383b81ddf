//! cartsync: keep a note checklist and a shopping list in step.
//!
//! # Usage
//!
//! ```text
//! cartsync init
//! cartsync run [--mode <mode>] [--interval <minutes>]
//! cartsync once [--mode <mode>] [--dry-run] [--json]
//! cartsync plan [--mode <mode>] [--json]
//! cartsync lists [--json]
//! cartsync baseline show [--json]
//! cartsync baseline reset
//! ```
//!
//! Every command accepts `--config <path>` in place of
//! `~/.cartsync/config.yaml`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    baseline::BaselineCommand, init::InitArgs, lists::ListsArgs, once::OnceArgs, plan::PlanArgs,
    run::RunArgs, Context,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cartsync",
    version,
    about = "Synchronize a note checklist with a shopping list",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.cartsync/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config to ~/.cartsync/config.yaml.
    Init(InitArgs),

    /// Sync now, then every `interval_minutes` until ctrl-c.
    Run(RunArgs),

    /// Run a single sync pass and print what it did.
    Once(OnceArgs),

    /// Show what the next pass would do, item by item, without changing anything.
    Plan(PlanArgs),

    /// Show the lists available on both sides.
    Lists(ListsArgs),

    /// Inspect or forget the remembered baseline.
    Baseline {
        #[command(subcommand)]
        command: BaselineCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    cartsync_daemon::init_tracing();
    let ctx = Context::new(cli.config)?;
    match cli.command {
        Commands::Init(args) => args.run(&ctx),
        Commands::Run(args) => args.run(&ctx),
        Commands::Once(args) => args.run(&ctx),
        Commands::Plan(args) => args.run(&ctx),
        Commands::Lists(args) => args.run(&ctx),
        Commands::Baseline { command } => commands::baseline::run(command, &ctx),
    }
}
