use colored::Colorize;
use reaper_core::WatchlistSnapshot;
use std::path::Path;
use std::time::Duration;

fn print_watchlist(snapshot: &WatchlistSnapshot) {
    println!(
        "  Watching {} resources in {}",
        snapshot.len(),
        snapshot.project_id.as_deref().unwrap_or("-").cyan()
    );
    for entry in &snapshot.entries {
        let deadline = entry
            .deletion_time
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "invalid TTL".to_string());
        let marker = if entry.ready {
            "expired".red()
        } else {
            "kept".green()
        };
        println!(
            "    {} {}/{} (deadline {})",
            marker, entry.zone, entry.name, deadline
        );
    }
}

pub async fn handle(
    config: Option<&Path>,
    dry_run: bool,
    json: bool,
    call_timeout: Duration,
) -> anyhow::Result<()> {
    let (path, file) = super::load_file(config)?;
    let cancel = super::cancel_on_shutdown();
    let mut failed = false;

    if !json {
        println!("Configuration: {}", path.display().to_string().cyan());
    }

    for config in &file.reapers {
        let mut reaper = super::build_reaper(call_timeout);

        let report = reaper.reconfigure(config, &cancel).await?;
        failed |= !report.is_success();

        let snapshot = reaper.snapshot();
        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            println!();
            println!("{} {}", "Reaper".bold(), config.label().cyan());
            print_watchlist(&snapshot);
            super::print_failures(&report.failures);
        }

        if dry_run {
            continue;
        }

        let now = reaper.now();
        let sweep = reaper.sweep(now, &cancel).await?;
        failed |= !sweep.is_success();

        if !json {
            for event in &sweep.deleted {
                println!(
                    "  {} Deleted {}/{}",
                    "✓".green(),
                    event.zone,
                    event.name
                );
            }
            super::print_failures(&sweep.failures);
        }
    }

    if failed {
        anyhow::bail!("Some resources could not be listed or deleted");
    }

    Ok(())
}
