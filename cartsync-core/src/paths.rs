//! On-disk layout.
//!
//! ```text
//! ~/.cartsync/
//!   config.yaml               (mode 0600)
//!   baseline.json             (last reconciled item set)
//!   sessions/<account>.json   (cached service tokens, mode 0600)
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.yaml";
pub const BASELINE_FILE: &str = "baseline.json";

pub fn cartsync_root(home: &Path) -> PathBuf {
    home.join(".cartsync")
}

pub fn config_path(home: &Path) -> PathBuf {
    cartsync_root(home).join(CONFIG_FILE)
}

pub fn baseline_path(home: &Path) -> PathBuf {
    cartsync_root(home).join(BASELINE_FILE)
}

pub fn sessions_dir(home: &Path) -> PathBuf {
    cartsync_root(home).join("sessions")
}

/// The current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

/// Expand a leading `~` in a configured path against `home`.
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_dot_cartsync() {
        let home = Path::new("/home/me");
        assert_eq!(config_path(home), Path::new("/home/me/.cartsync/config.yaml"));
        assert_eq!(baseline_path(home), Path::new("/home/me/.cartsync/baseline.json"));
        assert_eq!(sessions_dir(home), Path::new("/home/me/.cartsync/sessions"));
    }

    #[test]
    fn tilde_expands_only_as_leading_component() {
        let home = Path::new("/home/me");
        assert_eq!(
            expand_tilde(Path::new("~/notes"), home),
            Path::new("/home/me/notes")
        );
        assert_eq!(expand_tilde(Path::new("~"), home), Path::new("/home/me"));
        assert_eq!(expand_tilde(Path::new("/srv/~x"), home), Path::new("/srv/~x"));
        assert_eq!(expand_tilde(Path::new("~bob/x"), home), Path::new("~bob/x"));
    }
}
