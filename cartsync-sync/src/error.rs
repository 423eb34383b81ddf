//! Error types for cartsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use cartsync_core::{ListSelector, Side};
use cartsync_remote::RemoteError;

/// All errors that can arise from a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A side could not be reached (network, auth, timeout). Aborts the pass.
    #[error("{side} service unavailable: {source}")]
    RemoteUnavailable {
        side: Side,
        #[source]
        source: RemoteError,
    },

    /// The configured list does not exist on that side.
    #[error("{side} service has no list matching {selector}")]
    ListNotFound { side: Side, selector: ListSelector },

    /// The baseline file exists but cannot be parsed.
    #[error("baseline at {path} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    /// The baseline could not be persisted.
    #[error("failed to write baseline at {path}: {source}")]
    StoreWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (baseline store).
    #[error("baseline JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub(crate) fn unavailable(side: Side, source: RemoteError) -> Self {
        SyncError::RemoteUnavailable { side, source }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
