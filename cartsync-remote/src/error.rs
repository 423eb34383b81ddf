//! Error types for cartsync-remote.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a list service.
///
/// `Unavailable` covers anything that prevents talking to the service at
/// all (network, timeout, authentication). `Rejected` is a single add/remove
/// the service refused while otherwise reachable.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("{service} rejected '{item}': {reason}")]
    Rejected {
        service: String,
        item: String,
        reason: String,
    },

    /// Session cache could not be read or written.
    #[error("session store error at {path}: {reason}")]
    Session { path: PathBuf, reason: String },
}

impl RemoteError {
    pub fn unavailable(service: &str, reason: impl ToString) -> Self {
        RemoteError::Unavailable {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn rejected(service: &str, item: &str, reason: impl ToString) -> Self {
        RemoteError::Rejected {
            service: service.to_string(),
            item: item.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, RemoteError::Rejected { .. })
    }
}
