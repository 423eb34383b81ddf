//! cartsync core library: domain types, configuration, on-disk layout.
//!
//! - [`types`]: item sets, sides, sync modes, list selection
//! - [`config`]: `~/.cartsync/config.yaml` load / save / init
//! - [`paths`]: where every store lives under the home directory
//! - [`fsutil`]: atomic `.tmp` + rename writes
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod fsutil;
pub mod paths;
pub mod types;

pub use config::{BackendConfig, Config, SideConfig};
pub use error::ConfigError;
pub use types::{normalize_items, ItemSet, ListRef, ListSelector, Side, SyncMode};
