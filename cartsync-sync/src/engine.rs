//! Pass engine: one full sync pass over both sides.
//!
//! ## `run_pass` protocol
//!
//! 1. Purge completed entries on sides that ask for it (skipped on dry run).
//! 2. Snapshot side A, then side B. Either failing aborts the pass.
//! 3. Load the baseline (bidirectional mode only).
//! 4. Reconcile.
//! 5. Apply the target to A, then to B.
//! 6. Adjust the new baseline for items whose add/remove failed.
//! 7. Persist the baseline (skipped on dry run).
//!
//! Nothing is written to the baseline store before step 7, so a pass that
//! aborts in step 2 leaves the previous baseline untouched.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use cartsync_core::{Config, ItemSet, ListRef, ListSelector, Side, SyncMode};
use cartsync_remote::{from_config, ListService};

use crate::apply::{apply_side, ItemOp, SideReport};
use crate::baseline::BaselineStore;
use crate::error::SyncError;
use crate::reconcile::{reconcile, ItemFate};
use crate::snapshot::fetch_active;

// ---------------------------------------------------------------------------
// SideHandle
// ---------------------------------------------------------------------------

/// An authenticated service plus the list selected on it.
pub struct SideHandle {
    pub side: Side,
    pub service: Box<dyn ListService>,
    pub list: ListRef,
    pub purge_completed: bool,
}

impl std::fmt::Debug for SideHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideHandle")
            .field("side", &self.side)
            .field("service", &self.service.service_name())
            .field("list", &self.list)
            .field("purge_completed", &self.purge_completed)
            .finish()
    }
}

/// Authenticate `service` and pick the list matching `selector`.
///
/// A named list that does not exist, or an account without lists, is
/// [`SyncError::ListNotFound`]; there is no fallback to another list.
pub fn open_side(
    side: Side,
    mut service: Box<dyn ListService>,
    selector: &ListSelector,
    purge_completed: bool,
) -> Result<SideHandle, SyncError> {
    service
        .authenticate()
        .map_err(|e| SyncError::unavailable(side, e))?;
    let lists = service
        .available_lists()
        .map_err(|e| SyncError::unavailable(side, e))?;
    let list = selector
        .select(&lists)
        .cloned()
        .ok_or_else(|| SyncError::ListNotFound {
            side,
            selector: selector.clone(),
        })?;
    tracing::info!(
        "{} side: using {} list {}",
        side,
        service.service_name(),
        list
    );
    Ok(SideHandle {
        side,
        service,
        list,
        purge_completed,
    })
}

/// Authenticate the service configured for `side` and return every list it
/// can see.
pub fn list_catalog(config: &Config, home: &Path, side: Side) -> Result<Vec<ListRef>, SyncError> {
    let mut service = from_config(config.side(side), home, config.request_timeout())
        .map_err(|e| SyncError::unavailable(side, e))?;
    service
        .authenticate()
        .map_err(|e| SyncError::unavailable(side, e))?;
    service
        .available_lists()
        .map_err(|e| SyncError::unavailable(side, e))
}

// ---------------------------------------------------------------------------
// PassReport
// ---------------------------------------------------------------------------

/// Summary of one completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub mode: SyncMode,
    /// No baseline was available, so the pass seeded both sides.
    pub seeded: bool,
    pub dry_run: bool,
    pub note: SideReport,
    pub shopping: SideReport,
    /// The set persisted (or, on dry run, that would be persisted).
    pub baseline: ItemSet,
    pub baseline_saved: bool,
    pub fates: BTreeMap<String, ItemFate>,
    pub duration_ms: u64,
}

impl PassReport {
    pub fn side(&self, side: Side) -> &SideReport {
        match side {
            Side::Note => &self.note,
            Side::Shopping => &self.shopping,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.note.failures.len() + self.shopping.failures.len()
    }

    pub fn operation_count(&self) -> usize {
        self.note.changes.len() + self.shopping.changes.len()
    }

    /// Nothing changed and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.note.is_noop() && self.shopping.is_noop()
    }
}

/// Drop failed adds from `baseline` and put failed removes back in.
///
/// A failed add left out of the baseline is retried next pass as a new item;
/// a failed remove kept in it is retried as a deletion.
pub fn adjust_baseline(baseline: &mut ItemSet, reports: &[&SideReport]) {
    for report in reports {
        for item in report.failed(ItemOp::Add) {
            baseline.remove(item);
        }
        for item in report.failed(ItemOp::Remove) {
            baseline.insert(item.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

/// Owns both service connections and the baseline store across passes.
#[derive(Debug)]
pub struct SyncEngine {
    note: SideHandle,
    shopping: SideHandle,
    mode: SyncMode,
    store: BaselineStore,
}

impl SyncEngine {
    pub fn new(note: SideHandle, shopping: SideHandle, mode: SyncMode, store: BaselineStore) -> Self {
        Self {
            note,
            shopping,
            mode,
            store,
        }
    }

    /// Build both services from `config`, authenticate and select lists.
    pub fn connect(config: &Config, home: &Path) -> Result<Self, SyncError> {
        let note = connect_side(config, home, Side::Note)?;
        let shopping = connect_side(config, home, Side::Shopping)?;
        Ok(Self::new(
            note,
            shopping,
            config.sync_mode,
            BaselineStore::at(home),
        ))
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SyncMode) {
        self.mode = mode;
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    pub fn list(&self, side: Side) -> &ListRef {
        &self.handle(side).list
    }

    fn handle(&self, side: Side) -> &SideHandle {
        match side {
            Side::Note => &self.note,
            Side::Shopping => &self.shopping,
        }
    }

    /// Run one pass. Errors only when a snapshot cannot be taken or the
    /// baseline cannot be read for a reason other than corruption.
    pub fn run_pass(&mut self, dry_run: bool) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        tracing::info!(
            "sync pass starting (mode {}{})",
            self.mode,
            if dry_run { ", dry run" } else { "" }
        );

        // Step 1: housekeeping.
        if !dry_run {
            purge(&mut self.note);
            purge(&mut self.shopping);
        }

        // Step 2: snapshots, A before B.
        let set_a = fetch_active(self.note.service.as_mut(), &self.note.list)
            .map_err(|e| SyncError::unavailable(Side::Note, e))?;
        let set_b = fetch_active(self.shopping.service.as_mut(), &self.shopping.list)
            .map_err(|e| SyncError::unavailable(Side::Shopping, e))?;
        tracing::debug!(
            "snapshot: {} items on note, {} on shopping",
            set_a.len(),
            set_b.len()
        );

        // Step 3: baseline, bidirectional only.
        let prev = match self.mode {
            SyncMode::Bidirectional => match self.store.load() {
                Ok(prev) => prev,
                Err(err @ SyncError::StoreCorrupt { .. }) => {
                    tracing::warn!("{}; treating as first run", err);
                    None
                }
                Err(err) => return Err(err),
            },
            SyncMode::MirrorFromA | SyncMode::MirrorFromB => None,
        };

        // Step 4.
        let rec = reconcile(&set_a, &set_b, prev.as_ref(), self.mode);
        if rec.seeded {
            tracing::info!("no baseline found; seeding both sides with the union");
        }

        // Step 5.
        let note = apply_side(
            self.note.service.as_mut(),
            Side::Note,
            &self.note.list,
            &set_a,
            rec.target(Side::Note),
            dry_run,
        );
        let shopping = apply_side(
            self.shopping.service.as_mut(),
            Side::Shopping,
            &self.shopping.list,
            &set_b,
            rec.target(Side::Shopping),
            dry_run,
        );

        // Step 6.
        let mut baseline = rec.baseline;
        adjust_baseline(&mut baseline, &[&note, &shopping]);

        // Step 7.
        let baseline_saved = if dry_run {
            false
        } else {
            match self.store.save(&baseline, self.mode) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!("{}", err);
                    false
                }
            }
        };

        let report = PassReport {
            mode: self.mode,
            seeded: rec.seeded,
            dry_run,
            note,
            shopping,
            baseline,
            baseline_saved,
            fates: rec.fates,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        log_summary(&report);
        Ok(report)
    }
}

fn connect_side(config: &Config, home: &Path, side: Side) -> Result<SideHandle, SyncError> {
    let side_config = config.side(side);
    let service = from_config(side_config, home, config.request_timeout())
        .map_err(|e| SyncError::unavailable(side, e))?;
    open_side(
        side,
        service,
        &side_config.selector(),
        side_config.purge_completed,
    )
}

fn purge(handle: &mut SideHandle) {
    if !handle.purge_completed {
        return;
    }
    match handle.service.purge_completed(&handle.list) {
        Ok(0) => {}
        Ok(n) => tracing::info!("purged {} completed items from {}", n, handle.side),
        Err(err) => tracing::warn!("could not purge completed items on {}: {}", handle.side, err),
    }
}

fn log_summary(report: &PassReport) {
    tracing::info!(
        "sync pass done in {} ms: note +{} -{}, shopping +{} -{}, {} failures, {} items{}{}",
        report.duration_ms,
        report.note.added(),
        report.note.removed(),
        report.shopping.added(),
        report.shopping.removed(),
        report.failure_count(),
        report.baseline.len(),
        if report.seeded { ", seeded" } else { "" },
        if !report.dry_run && !report.baseline_saved {
            ", baseline NOT saved"
        } else {
            ""
        }
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
