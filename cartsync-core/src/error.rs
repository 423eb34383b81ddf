//! Error types for cartsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config parsed but a field holds an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No config file at the expected path.
    #[error("config not found at {path}; run `cartsync init` first")]
    ConfigNotFound { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
