pub mod baseline;
pub mod init;
pub mod lists;
pub mod once;
pub mod plan;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use cartsync_core::{config, paths, Config, SyncMode};

/// Home directory and config location shared by every command.
#[derive(Debug)]
pub struct Context {
    pub home: PathBuf,
    pub config_path: PathBuf,
}

impl Context {
    pub fn new(config_override: Option<PathBuf>) -> Result<Self> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let config_path = config_override.unwrap_or_else(|| paths::config_path(&home));
        Ok(Self { home, config_path })
    }

    pub fn load_config(&self) -> Result<Config> {
        config::load_from(&self.config_path)
            .with_context(|| format!("failed to load {}", self.config_path.display()))
    }

    /// Load the config and apply a `--mode` override.
    pub fn load_config_with_mode(&self, mode: Option<SyncMode>) -> Result<Config> {
        let mut config = self.load_config()?;
        if let Some(mode) = mode {
            config.sync_mode = mode;
        }
        Ok(config)
    }
}
