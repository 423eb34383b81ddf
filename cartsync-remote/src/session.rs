//! Cached service sessions, keyed by account identity.
//!
//! Persists one JSON document per account at
//! `<home>/.cartsync/sessions/<sha256(account)>.json`. The file name is a
//! digest so that account names (usually e-mail addresses) never leak into
//! directory listings. Writes are atomic and mode `0600`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use cartsync_core::{fsutil, paths};

use crate::error::RemoteError;

/// An opaque login token plus whatever the service needs alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub account: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl Session {
    pub fn new(account: &str, token: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            account: account.to_string(),
            token: token.into(),
            user_id,
            saved_at: Utc::now(),
        }
    }
}

/// Stable, case-insensitive key for an account name.
pub fn account_key(account: &str) -> String {
    let mut h = Sha256::new();
    h.update(account.trim().to_lowercase().as_bytes());
    hex::encode(h.finalize())
}

pub fn session_path_at(home: &Path, account: &str) -> PathBuf {
    paths::sessions_dir(home).join(format!("{}.json", account_key(account)))
}

/// Load the cached session for `account`.
///
/// Returns `Ok(None)` when nothing is cached. A cache file that no longer
/// parses is reported as an error; callers usually log it and log in again.
pub fn load_at(home: &Path, account: &str) -> Result<Option<Session>, RemoteError> {
    let path = session_path_at(home, account);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(session_err(&path, err)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|err| session_err(&path, err))
}

/// Save `session` atomically.
pub fn save_at(home: &Path, session: &Session) -> Result<(), RemoteError> {
    let path = session_path_at(home, &session.account);
    let json = serde_json::to_string_pretty(session).map_err(|err| session_err(&path, err))?;
    fsutil::write_atomic(&path, json.as_bytes(), true).map_err(|err| session_err(&path, err))
}

/// Forget the cached session for `account`. Missing files are fine.
pub fn clear_at(home: &Path, account: &str) -> Result<(), RemoteError> {
    let path = session_path_at(home, account);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(session_err(&path, err)),
    }
}

fn session_err(path: &Path, reason: impl ToString) -> RemoteError {
    RemoteError::Session {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_session_is_none() {
        let home = TempDir::new().unwrap();
        assert!(load_at(home.path(), "me@example.com").unwrap().is_none());
    }

    #[test]
    fn roundtrip_save_load() {
        let home = TempDir::new().unwrap();
        let session = Session::new("me@example.com", "tok-123", Some("user-1".into()));
        save_at(home.path(), &session).unwrap();
        let loaded = load_at(home.path(), "me@example.com").unwrap();
        assert_eq!(loaded, Some(session));
    }

    #[test]
    fn key_ignores_case_and_surrounding_space() {
        assert_eq!(account_key("Me@Example.com "), account_key("me@example.com"));
        assert_ne!(account_key("a@example.com"), account_key("b@example.com"));
        assert_eq!(account_key("x").len(), 64);
    }

    #[test]
    fn file_name_does_not_contain_account() {
        let home = TempDir::new().unwrap();
        let path = session_path_at(home.path(), "me@example.com");
        assert!(!path.to_string_lossy().contains("example"));
    }

    #[test]
    fn corrupt_session_is_an_error() {
        let home = TempDir::new().unwrap();
        let path = session_path_at(home.path(), "me@example.com");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let err = load_at(home.path(), "me@example.com").unwrap_err();
        assert!(matches!(err, RemoteError::Session { .. }));
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &Session::new("me", "t", None)).unwrap();
        clear_at(home.path(), "me").unwrap();
        assert!(load_at(home.path(), "me").unwrap().is_none());
        clear_at(home.path(), "me").unwrap();
    }
}
