//! `cartsync lists`: list discovery on both sides.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cartsync_core::Side;
use cartsync_sync::list_catalog;

use super::Context;

/// Arguments for `cartsync lists`.
#[derive(Args, Debug)]
pub struct ListsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    side: Side,
    id: String,
    name: String,
    selected: bool,
}

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "side")]
    side: String,
    #[tabled(rename = "list")]
    name: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "synced")]
    selected: String,
}

impl ListsArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let config = ctx.load_config()?;
        let mut entries = Vec::new();
        let mut failures = 0usize;

        for side in Side::all() {
            match list_catalog(&config, &ctx.home, *side) {
                Ok(lists) => {
                    let selected = config.side(*side).selector().select(&lists).cloned();
                    entries.extend(lists.into_iter().map(|list| ListEntry {
                        side: *side,
                        selected: selected.as_ref() == Some(&list),
                        id: list.id,
                        name: list.name,
                    }));
                }
                Err(err) => {
                    failures += 1;
                    eprintln!("{} {}", "✗".red().bold(), err);
                }
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else if entries.is_empty() {
            println!("No lists found.");
        } else {
            let rows: Vec<ListRow> = entries
                .iter()
                .map(|entry| ListRow {
                    side: entry.side.to_string(),
                    name: entry.name.clone(),
                    id: entry.id.clone(),
                    selected: if entry.selected {
                        "✓".green().bold().to_string()
                    } else {
                        String::new()
                    },
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }

        if failures > 0 {
            bail!("could not list {failures} side(s)");
        }
        Ok(())
    }
}
