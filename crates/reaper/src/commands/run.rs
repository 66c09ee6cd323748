use colored::Colorize;
use reaper_core::{CancelSignal, Reaper, ReaperConfig};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

pub async fn handle(config: Option<&Path>, tick: Duration, call_timeout: Duration) -> anyhow::Result<()> {
    let (path, file) = super::load_file(config)?;
    println!("Configuration: {}", path.display().to_string().cyan());
    println!(
        "{}",
        format!(
            "Starting {} reapers (tick {:?}, press Ctrl+C to stop)",
            file.reapers.len(),
            tick
        )
        .blue()
    );

    let cancel = super::cancel_on_shutdown();
    let mut tasks = JoinSet::new();

    for config in file.reapers {
        let reaper = super::build_reaper(call_timeout);
        tasks.spawn(run_reaper(reaper, config, tick, cancel.clone()));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Reaper task failed: {}", e);
        }
    }

    println!("{}", "✓ All reapers stopped".green());
    Ok(())
}

/// Drive one reaper: build its watchlist, then refresh and sweep whenever the gate opens
async fn run_reaper(mut reaper: Reaper, config: ReaperConfig, tick: Duration, mut cancel: CancelSignal) {
    let label = config.label().to_string();

    match reaper.reconfigure(&config, &cancel).await {
        Ok(report) => tracing::info!("Reaper {} started with {} watched resources", label, report.watched),
        Err(e) if e.is_cancelled() => return,
        Err(e) => {
            tracing::error!("Reaper {} cannot start: {}", label, e);
            return;
        }
    }

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        if !reaper.is_due(reaper.now()) {
            continue;
        }

        // Pick up resources created since the last sweep before deleting
        match reaper.reconfigure(&config, &cancel).await {
            Ok(_) => {}
            Err(e) if e.is_cancelled() => break,
            Err(e) => {
                tracing::error!("Reaper {}: {}", label, e);
                continue;
            }
        }

        match reaper.tick(&cancel).await {
            Ok(Some(report)) => {
                for event in &report.deleted {
                    println!(
                        "{} [{}] Deleted {}/{} (TTL {:?})",
                        "✓".green(),
                        label,
                        event.zone,
                        event.name,
                        event.ttl
                    );
                }
            }
            Ok(None) => {}
            Err(e) if e.is_cancelled() => break,
            Err(e) => tracing::error!("Reaper {}: {}", label, e),
        }
    }

    tracing::info!("Reaper {} stopped", label);
}
