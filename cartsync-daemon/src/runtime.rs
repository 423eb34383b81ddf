use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use cartsync_core::Config;
use cartsync_sync::SyncEngine;

use crate::error::{io_err, DaemonError};
use crate::scheduler::{Scheduler, SchedulerStats};

/// Start the sync service and block the current thread until it exits.
pub fn start_blocking(home: &Path, config: Config) -> Result<SchedulerStats, DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config))
}

/// Connect both sides, then drive passes until ctrl-c (or after one pass
/// when the interval is zero).
pub async fn run(home: PathBuf, config: Config) -> Result<SchedulerStats, DaemonError> {
    let interval = config.interval();
    tracing::info!(
        mode = %config.sync_mode,
        note = config.note.backend.kind(),
        shopping = config.shopping.backend.kind(),
        "connecting"
    );
    let engine = tokio::task::spawn_blocking(move || SyncEngine::connect(&config, &home))
        .await
        .map_err(|err| DaemonError::Join("connect", err.to_string()))??;
    let engine = Arc::new(Mutex::new(engine));

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);
    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received ctrl-c, stopping after the current pass");
                    let _ = shutdown.send(());
                }
                Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
            }
        })
    };

    let result = Scheduler::new(interval)
        .run(move || run_pass(engine.clone()), shutdown_rx)
        .await;

    signal_handle.abort();
    drop(shutdown_tx);
    result
}

/// One pass on the blocking pool; the engine's service calls block.
async fn run_pass(engine: Arc<Mutex<SyncEngine>>) -> Result<(), DaemonError> {
    tokio::task::spawn_blocking(move || {
        let mut engine = engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        engine.run_pass(false).map(|_| ()).map_err(DaemonError::from)
    })
    .await
    .map_err(|err| DaemonError::Join("sync pass", err.to_string()))?
}

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides the default
/// `info` filter; `CARTSYNC_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CARTSYNC_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use cartsync_core::{BackendConfig, SideConfig, SyncMode};
    use tempfile::TempDir;

    fn checklist_config(home: &Path, interval_minutes: u64) -> Config {
        let side = |name: &str| {
            let dir = home.join(name);
            fs::create_dir_all(&dir).expect("list dir");
            SideConfig {
                backend: BackendConfig::Checklist { dir },
                list: None,
                purge_completed: false,
            }
        };
        Config {
            sync_mode: SyncMode::Bidirectional,
            interval_minutes,
            request_timeout_seconds: 5,
            note: side("notes"),
            shopping: side("shop"),
        }
    }

    #[tokio::test]
    async fn run_once_syncs_and_returns() {
        let home = TempDir::new().expect("home");
        let config = checklist_config(home.path(), 0);
        fs::write(home.path().join("notes/Groceries.md"), "- [ ] milk\n").unwrap();
        fs::write(home.path().join("shop/Groceries.md"), "- [ ] bread\n").unwrap();

        let stats = run(home.path().to_path_buf(), config).await.expect("run");

        assert_eq!(stats.passes_started, 1);
        assert_eq!(
            fs::read_to_string(home.path().join("shop/Groceries.md")).unwrap(),
            "- [ ] bread\n- [ ] milk\n"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_remote_calls_drop_ticks_instead_of_overlapping() {
        use std::time::{Duration, Instant};

        use cartsync_core::{ListSelector, Side};
        use cartsync_remote::MemoryService;
        use cartsync_sync::{open_side, BaselineStore};

        let home = TempDir::new().expect("home");
        let note = MemoryService::new("note").with_list("Groceries", ["milk"]);
        let shop = MemoryService::new("shop").with_list("Groceries", ["bread"]);
        let open = |side, service: &MemoryService| {
            open_side(side, Box::new(service.clone()), &ListSelector::First, false)
                .expect("open side")
        };
        let engine = SyncEngine::new(
            open(Side::Note, &note),
            open(Side::Shopping, &shop),
            SyncMode::Bidirectional,
            BaselineStore::at(home.path()),
        );
        let engine = Arc::new(Mutex::new(engine));
        // Every shopping call takes 100ms; ticks arrive every 20ms.
        shop.set_delay(Some(Duration::from_millis(100)));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = shutdown_tx.send(());
        });
        let started = Instant::now();
        let stats = Scheduler::new(Some(Duration::from_millis(20)))
            .run(move || run_pass(engine.clone()), shutdown_rx)
            .await
            .expect("scheduler");
        let elapsed = started.elapsed();

        assert_eq!(stats.passes_failed, 0);
        assert!(stats.ticks_dropped > 0, "{stats:?}");
        // Each pass makes at least one 100ms call, so passes ran one at a time.
        let max_sequential = (elapsed.as_millis() / 100) as u64;
        assert!(stats.passes_started <= max_sequential, "{stats:?} in {elapsed:?}");
        assert_eq!(shop.mutations(), vec!["add:milk"]);
        assert_eq!(note.mutations(), vec!["add:bread"]);
    }

    #[tokio::test]
    async fn connect_failure_is_an_error() {
        let home = TempDir::new().expect("home");
        let config = checklist_config(home.path(), 0);
        // Directories exist but hold no lists.
        let err = run(home.path().to_path_buf(), config).await.unwrap_err();
        assert!(matches!(err, DaemonError::Sync(_)));
    }

    #[tokio::test]
    async fn first_pass_failure_is_an_error() {
        let home = TempDir::new().expect("home");
        let config = checklist_config(home.path(), 5);
        fs::write(home.path().join("notes/Groceries.md"), "- [ ] milk\n").unwrap();
        fs::write(home.path().join("shop/Groceries.md"), "").unwrap();
        // A directory where the baseline file should be cannot be read.
        fs::create_dir_all(cartsync_core::paths::baseline_path(home.path())).unwrap();

        let err = run(home.path().to_path_buf(), config).await.unwrap_err();
        assert!(matches!(err, DaemonError::Sync(_)));
    }
}
