//! Applier: push a target set to one side with per-item calls.
//!
//! ## `apply_side` protocol
//!
//! 1. Diff the side's snapshot against the target.
//! 2. Remove every `current \ target` item.
//! 3. Add every `target \ current` item.
//!
//! All removes run before any add. A failed call is logged, recorded in the
//! report and skipped; the remaining items are still processed.

use serde::Serialize;

use cartsync_core::{ItemSet, ListRef, Side};
use cartsync_remote::{ListService, RemoteError};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOp {
    Add,
    Remove,
}

/// Outcome of an individual item operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemChange {
    Removed { item: String },
    Added { item: String },
    /// Dry run: the item *would* have been removed.
    WouldRemove { item: String },
    /// Dry run: the item *would* have been added.
    WouldAdd { item: String },
}

/// A single add/remove the service refused or could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub item: String,
    pub op: ItemOp,
    /// The service refused the item itself, rather than being unreachable.
    pub rejected: bool,
    pub reason: String,
}

/// Everything that happened to one side during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideReport {
    pub side: Side,
    pub list: String,
    pub changes: Vec<ItemChange>,
    pub failures: Vec<ItemFailure>,
}

impl SideReport {
    fn new(side: Side, list: &ListRef) -> Self {
        Self {
            side,
            list: list.name.clone(),
            changes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn added(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ItemChange::Added { .. } | ItemChange::WouldAdd { .. }))
            .count()
    }

    pub fn removed(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, ItemChange::Removed { .. } | ItemChange::WouldRemove { .. }))
            .count()
    }

    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.failures.is_empty()
    }

    /// Items for which `op` failed on this side.
    pub fn failed(&self, op: ItemOp) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(move |f| f.op == op)
            .map(|f| f.item.as_str())
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Items to remove from and add to a side to turn `current` into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SideDiff {
    pub remove: Vec<String>,
    pub add: Vec<String>,
}

impl SideDiff {
    pub fn between(current: &ItemSet, target: &ItemSet) -> Self {
        Self {
            remove: current.difference(target).cloned().collect(),
            add: target.difference(current).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

// ---------------------------------------------------------------------------
// apply_side
// ---------------------------------------------------------------------------

/// Bring `list` on `service` from `current` to `target`.
///
/// In `dry_run` mode the service is never called.
pub fn apply_side(
    service: &mut dyn ListService,
    side: Side,
    list: &ListRef,
    current: &ItemSet,
    target: &ItemSet,
    dry_run: bool,
) -> SideReport {
    let diff = SideDiff::between(current, target);
    let mut report = SideReport::new(side, list);

    for item in diff.remove {
        if dry_run {
            tracing::info!("[dry-run] would remove from {}: {}", side, item);
            report.changes.push(ItemChange::WouldRemove { item });
            continue;
        }
        match service.remove_item(list, &item) {
            Ok(()) => {
                tracing::info!("removed from {}: {}", side, item);
                report.changes.push(ItemChange::Removed { item });
            }
            Err(err) => record_failure(&mut report, item, ItemOp::Remove, err),
        }
    }

    for item in diff.add {
        if dry_run {
            tracing::info!("[dry-run] would add to {}: {}", side, item);
            report.changes.push(ItemChange::WouldAdd { item });
            continue;
        }
        match service.add_item(list, &item) {
            Ok(()) => {
                tracing::info!("added to {}: {}", side, item);
                report.changes.push(ItemChange::Added { item });
            }
            Err(err) => record_failure(&mut report, item, ItemOp::Add, err),
        }
    }

    report
}

fn record_failure(report: &mut SideReport, item: String, op: ItemOp, err: RemoteError) {
    tracing::warn!(
        "failed to {} '{}' on {}: {}",
        match op {
            ItemOp::Add => "add",
            ItemOp::Remove => "remove",
        },
        item,
        report.side,
        err
    );
    report.failures.push(ItemFailure {
        item,
        op,
        rejected: err.is_rejected(),
        reason: err.to_string(),
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
