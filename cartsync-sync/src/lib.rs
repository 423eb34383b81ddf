//! # cartsync-sync
//!
//! Three-way shopping-list sync between a note list (side A) and a shopping
//! list (side B).
//!
//! Build a [`SyncEngine`] with [`SyncEngine::connect`] and call
//! [`SyncEngine::run_pass`] once per scheduled tick. The reconciliation
//! itself is the pure function [`reconcile`].

pub mod apply;
pub mod baseline;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod snapshot;

pub use apply::{apply_side, ItemChange, ItemFailure, ItemOp, SideDiff, SideReport};
pub use baseline::{BaselineFile, BaselineStore};
pub use engine::{adjust_baseline, list_catalog, open_side, PassReport, SideHandle, SyncEngine};
pub use error::SyncError;
pub use reconcile::{classify, reconcile, ItemFate, Reconciliation};
pub use snapshot::fetch_active;
