//! `cartsync baseline show|reset`

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;

use cartsync_sync::BaselineStore;

use super::Context;

#[derive(Subcommand, Debug)]
pub enum BaselineCommand {
    /// Print the item set remembered from the last pass.
    Show {
        /// Emit machine-readable JSON (`null` when there is no baseline).
        #[arg(long)]
        json: bool,
    },
    /// Forget the baseline; the next pass merges both lists as on first run.
    Reset,
}

pub fn run(command: BaselineCommand, ctx: &Context) -> Result<()> {
    let store = BaselineStore::at(&ctx.home);
    match command {
        BaselineCommand::Show { json } => {
            let file = store
                .load_file()
                .with_context(|| format!("failed to read {}", store.path().display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&file)?);
                return Ok(());
            }
            let Some(file) = file else {
                println!("No baseline yet; the next pass will seed both lists.");
                return Ok(());
            };
            let mode = file
                .mode
                .map(|mode| format!(", {mode}"))
                .unwrap_or_default();
            println!(
                "Baseline: {} items (synced {}{})",
                file.items.len(),
                format_age(file.synced_at, Utc::now()),
                mode
            );
            for item in &file.items {
                println!("  · {item}");
            }
        }
        BaselineCommand::Reset => {
            if store.reset().context("failed to remove baseline")? {
                println!("✓ Baseline removed; the next pass will seed both lists.");
            } else {
                println!("No baseline to remove.");
            }
        }
    }
    Ok(())
}

fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn ages_are_rounded_down() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now - Duration::seconds(125), now), "2m ago");
        assert_eq!(format_age(now - Duration::hours(5), now), "5h ago");
        assert_eq!(format_age(now - Duration::days(3), now), "3d ago");
        assert_eq!(format_age(now + Duration::seconds(30), now), "just now");
    }
}
