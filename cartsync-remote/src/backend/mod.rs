//! Concrete [`ListService`](crate::ListService) implementations and the
//! factory that builds one from a side's configuration.

pub mod bring;
pub mod checklist;
pub mod memory;

use std::path::Path;
use std::time::Duration;

use cartsync_core::{paths, BackendConfig, SideConfig};

use crate::error::RemoteError;
use crate::service::ListService;

pub use bring::{BringCredentials, BringService};
pub use checklist::ChecklistService;
pub use memory::MemoryService;

/// Build the service described by `side`.
///
/// Secrets are read from the environment variables the config names; a
/// missing variable is reported as `Unavailable` since no login can succeed.
pub fn from_config(
    side: &SideConfig,
    home: &Path,
    timeout: Duration,
) -> Result<Box<dyn ListService>, RemoteError> {
    match &side.backend {
        BackendConfig::Checklist { dir } => Ok(Box::new(checklist_at(dir, home))),
        BackendConfig::Bring {
            email,
            password_env,
            api_key_env,
            base_url,
        } => {
            let credentials = BringCredentials {
                email: email.clone(),
                password: read_env("bring", password_env)?,
                api_key: read_env("bring", api_key_env)?,
            };
            Ok(Box::new(BringService::new(
                credentials,
                base_url.as_deref(),
                home,
                timeout,
            )))
        }
    }
}

/// A checklist service rooted at `dir`, with a leading `~` meaning `home`.
fn checklist_at(dir: &Path, home: &Path) -> ChecklistService {
    ChecklistService::new(paths::expand_tilde(dir, home))
}

fn read_env(service: &str, var: &str) -> Result<String, RemoteError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(RemoteError::unavailable(
            service,
            format!("environment variable {var} is not set"),
        )),
    }
}
