use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the scheduler and runtime bootstrap.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] cartsync_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] cartsync_sync::SyncError),

    #[error("{0} task join failure: {1}")]
    Join(&'static str, String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
