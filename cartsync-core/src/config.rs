//! `~/.cartsync/config.yaml`: process-wide settings, loaded once at startup
//! and passed explicitly into every constructor that needs them.
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::fsutil;
use crate::paths;
use crate::types::{ListSelector, Side, SyncMode};

pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
/// One year.
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync_mode: SyncMode,
    /// Minutes between passes; `0` runs a single pass and exits.
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    pub note: SideConfig,
    pub shopping: SideConfig,
}

/// Backend and list selection for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideConfig {
    #[serde(flatten)]
    pub backend: BackendConfig,
    /// Display name of the list to sync; omitted means the first list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    /// Delete completed (checked) entries before each pass.
    #[serde(default)]
    pub purge_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// A directory of Markdown checklists, one list per `*.md` file.
    Checklist { dir: PathBuf },
    /// The Bring! shopping list REST API.
    Bring {
        email: String,
        #[serde(default = "default_password_env")]
        password_env: String,
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Checklist { .. } => "checklist",
            BackendConfig::Bring { .. } => "bring",
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

fn default_password_env() -> String {
    "BRING_PASSWORD".to_string()
}

fn default_api_key_env() -> String {
    "BRING_API_KEY".to_string()
}

impl SideConfig {
    pub fn selector(&self) -> ListSelector {
        ListSelector::from_name(self.list.as_deref())
    }
}

impl Config {
    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::Note => &self.note,
            Side::Shopping => &self.shopping,
        }
    }

    /// Per-request timeout for remote calls.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Time between passes, or `None` for run-once. Capped at
    /// [`MAX_INTERVAL_MINUTES`].
    pub fn interval(&self) -> Option<Duration> {
        match self.interval_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(
                minutes.min(MAX_INTERVAL_MINUTES).saturating_mul(60),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(ConfigError::Invalid {
                field: "interval_minutes",
                reason: format!("must be at most {MAX_INTERVAL_MINUTES} (one year)"),
            });
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        for side in Side::all() {
            validate_backend(*side, &self.side(*side).backend)?;
        }
        if let (
            BackendConfig::Checklist { dir: note_dir },
            BackendConfig::Checklist { dir: shop_dir },
        ) = (&self.note.backend, &self.shopping.backend)
        {
            if note_dir == shop_dir && self.note.selector() == self.shopping.selector() {
                return Err(ConfigError::Invalid {
                    field: "shopping.list",
                    reason: "note and shopping sides point at the same checklist".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn validate_backend(side: Side, backend: &BackendConfig) -> Result<(), ConfigError> {
    match backend {
        BackendConfig::Checklist { dir } => {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    field: side_field(side, "dir"),
                    reason: "checklist directory must not be empty".to_string(),
                });
            }
        }
        BackendConfig::Bring {
            email,
            password_env,
            api_key_env,
            ..
        } => {
            if email.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: side_field(side, "email"),
                    reason: "account email must not be empty".to_string(),
                });
            }
            if password_env.trim().is_empty() || api_key_env.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: side_field(side, "password_env"),
                    reason: "environment variable names must not be empty".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn side_field(side: Side, field: &str) -> &'static str {
    match (side, field) {
        (Side::Note, "dir") => "note.dir",
        (Side::Note, "email") => "note.email",
        (Side::Note, _) => "note.password_env",
        (Side::Shopping, "dir") => "shopping.dir",
        (Side::Shopping, "email") => "shopping.email",
        (Side::Shopping, _) => "shopping.password_env",
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Parse and validate a config file at an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `<home>/.cartsync/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&paths::config_path(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&paths::home()?)
}

/// Atomically save `config` to `<home>/.cartsync/config.yaml` (mode 0600).
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let path = paths::config_path(home);
    let yaml = serde_yaml::to_string(config)?;
    fsutil::write_atomic(&path, yaml.as_bytes(), true).map_err(|e| io_err(&path, e))
}

/// Commented starter config written by `cartsync init`.
pub const TEMPLATE: &str = r#"# cartsync configuration
#
# sync_mode: bidirectional | mirror_from_note | mirror_from_shopping
sync_mode: bidirectional
# Minutes between passes. 0 runs a single pass and exits.
interval_minutes: 60
request_timeout_seconds: 60

# Side A: a directory of Markdown checklists (one list per *.md file).
note:
  kind: checklist
  dir: ~/notes/lists
  # list: Groceries          # omit to use the first list
  purge_completed: true

# Side B: a Bring! shopping list account.
shopping:
  kind: bring
  email: me@example.com
  password_env: BRING_PASSWORD
  api_key_env: BRING_API_KEY
  # list: Home
"#;

/// Write [`TEMPLATE`] unless a config already exists.
///
/// Returns the config path and whether a new file was written.
pub fn init_at(home: &Path) -> Result<(PathBuf, bool), ConfigError> {
    let path = paths::config_path(home);
    if path.exists() {
        return Ok((path, false));
    }
    fsutil::write_atomic(&path, TEMPLATE.as_bytes(), true).map_err(|e| io_err(&path, e))?;
    Ok((path, true))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
