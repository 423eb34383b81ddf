//! Baseline store: the item set both sides converged on at the end of the
//! previous pass.
//!
//! Persists a `BaselineFile` JSON document at `<home>/.cartsync/baseline.json`.
//! Item names are stored as a JSON string array, so names containing line
//! breaks, quotes or any other character round-trip exactly. Writes use the
//! atomic `.tmp` + rename pattern.
//!
//! "No file" and "empty set" are different states: the first means no pass
//! has ever completed (first-run seeding), the second that the last pass
//! converged on an empty list.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartsync_core::{fsutil, paths, ItemSet, SyncMode};

use crate::error::SyncError;

/// On-disk baseline payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaselineFile {
    pub synced_at: DateTime<Utc>,
    /// Mode of the pass that wrote this baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SyncMode>,
    pub items: ItemSet,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BaselineCompat {
    Structured(BaselineStructuredCompat),
    Legacy(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct BaselineStructuredCompat {
    synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    mode: Option<SyncMode>,
    items: Vec<String>,
}

/// Handle on the baseline file of one home directory.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    /// The store at `<home>/.cartsync/baseline.json`.
    pub fn at(home: &Path) -> Self {
        Self::with_path(paths::baseline_path(home))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full baseline document.
    ///
    /// `Ok(None)` when no baseline has been written yet;
    /// [`SyncError::StoreCorrupt`] when the file exists but does not parse.
    pub fn load_file(&self) -> Result<Option<BaselineFile>, SyncError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                return Err(self.corrupt(format!("not UTF-8: {err}")));
            }
            Err(err) => return Err(crate::error::io_err(&self.path, err)),
        };
        let parsed = serde_json::from_str::<BaselineCompat>(&contents)
            .map_err(|err| self.corrupt(err.to_string()))?;
        Ok(Some(match parsed {
            BaselineCompat::Structured(file) => BaselineFile {
                synced_at: file.synced_at.unwrap_or_else(Utc::now),
                mode: file.mode,
                items: file.items.into_iter().collect(),
            },
            BaselineCompat::Legacy(items) => BaselineFile {
                synced_at: Utc::now(),
                mode: None,
                items: items.into_iter().collect(),
            },
        }))
    }

    /// The remembered item set, if any.
    pub fn load(&self) -> Result<Option<ItemSet>, SyncError> {
        Ok(self.load_file()?.map(|file| file.items))
    }

    /// Persist `items` atomically, stamped with the current time.
    pub fn save(&self, items: &ItemSet, mode: SyncMode) -> Result<(), SyncError> {
        let file = BaselineFile {
            synced_at: Utc::now(),
            mode: Some(mode),
            items: items.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fsutil::write_atomic(&self.path, json.as_bytes(), false).map_err(|source| {
            SyncError::StoreWriteFailed {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Forget the baseline; the next bidirectional pass seeds from the union.
    ///
    /// Returns whether a baseline existed.
    pub fn reset(&self) -> Result<bool, SyncError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(crate::error::io_err(&self.path, err)),
        }
    }

    fn corrupt(&self, reason: String) -> SyncError {
        SyncError::StoreCorrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
