pub mod once;
pub mod run;
pub mod validate;

use colored::Colorize;
use reaper_config::ReaperFile;
use reaper_core::{CancelSignal, ClientRegistry, Failure, Reaper, cancel_pair};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load and validate the explicit file, or the discovered one
pub fn load_file(config: Option<&Path>) -> anyhow::Result<(PathBuf, ReaperFile)> {
    match config {
        Some(path) => {
            let file = reaper_config::load_config(path)?;
            file.validate()?;
            Ok((path.to_path_buf(), file))
        }
        None => Ok(reaper_config::load()?),
    }
}

/// Every provider binding this binary ships with
pub fn client_registry() -> ClientRegistry {
    let mut registry = ClientRegistry::new();
    reaper_cloud_gce::register(&mut registry);
    registry
}

pub fn build_reaper(call_timeout: Duration) -> Reaper {
    Reaper::with_system_clock(client_registry()).with_call_timeout(call_timeout)
}

/// A signal that fires on SIGINT or SIGTERM
pub fn cancel_on_shutdown() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        handle.cancel();
    });
    signal
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received SIGINT");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT");
        }
    }
}

pub fn print_failures(failures: &[Failure]) {
    for failure in failures {
        eprintln!("  {} {}", "✗".red(), failure);
    }
}
