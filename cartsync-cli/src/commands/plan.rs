//! `cartsync plan`: per-item view of what the next pass would do.

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use cartsync_core::SyncMode;
use cartsync_sync::{ItemChange, ItemFate, PassReport, SideReport};

use super::once::run_single_pass;
use super::Context;

/// Arguments for `cartsync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plan as if `sync_mode` were this.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SyncMode>,

    /// Emit the dry-run pass report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "item")]
    item: String,
    #[tabled(rename = "fate")]
    fate: String,
    #[tabled(rename = "note")]
    note: String,
    #[tabled(rename = "shopping")]
    shopping: String,
}

impl PlanArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let report = run_single_pass(ctx, self.mode, true)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        print_plan(&report);
        Ok(())
    }
}

fn print_plan(report: &PassReport) {
    if report.fates.is_empty() {
        println!("Both lists are empty; nothing to do.");
        return;
    }

    let rows: Vec<PlanRow> = report
        .fates
        .iter()
        .map(|(item, fate)| PlanRow {
            item: item.clone(),
            fate: describe(*fate),
            note: action(&report.note, item),
            shopping: action(&report.shopping, item),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let pending = report.operation_count();
    if pending == 0 {
        println!("No changes needed ({}).", report.mode);
    } else {
        println!(
            "{pending} change(s) pending ({}{}). Run `cartsync once` to apply.",
            report.mode,
            if report.seeded { ", first run" } else { "" }
        );
    }
}

fn describe(fate: ItemFate) -> String {
    match fate {
        ItemFate::Kept => "kept".to_string(),
        ItemFate::Copied { from } => format!("new on {from}"),
        ItemFate::Deleted { on } => format!("deleted on {on}"),
        ItemFate::Vanished => "gone from both".to_string(),
    }
}

fn action(side: &SideReport, item: &str) -> String {
    side.changes
        .iter()
        .find_map(|change| match change {
            ItemChange::WouldAdd { item: name } | ItemChange::Added { item: name }
                if name == item =>
            {
                Some("add")
            }
            ItemChange::WouldRemove { item: name } | ItemChange::Removed { item: name }
                if name == item =>
            {
                Some("remove")
            }
            _ => None,
        })
        .unwrap_or("·")
        .to_string()
}
