mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "reaper")]
#[command(about = "Deletes cloud resources once their TTL has passed", long_about = None)]
struct Cli {
    /// Configuration file (default: discovered from the current directory)
    #[arg(short, long, global = true, env = "REAPER_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured reaper until interrupted
    Run {
        /// Seconds between schedule checks
        #[arg(long, default_value = "60")]
        tick: u64,
        /// Seconds before a provider call is abandoned
        #[arg(long, default_value = "300")]
        call_timeout: u64,
    },
    /// Rebuild every watchlist and sweep immediately, ignoring schedules
    Once {
        /// Only print what would be deleted
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Print watchlists as JSON
        #[arg(long)]
        json: bool,
        /// Seconds before a provider call is abandoned
        #[arg(long, default_value = "300")]
        call_timeout: u64,
    },
    /// Check the configuration file
    Validate,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Version => {
            println!("reaper {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Validate => {
            commands::validate::handle(config)?;
        }
        Commands::Run { tick, call_timeout } => {
            commands::run::handle(
                config,
                Duration::from_secs(tick.max(1)),
                Duration::from_secs(call_timeout),
            )
            .await?;
        }
        Commands::Once {
            dry_run,
            json,
            call_timeout,
        } => {
            commands::once::handle(config, dry_run, json, Duration::from_secs(call_timeout))
                .await?;
        }
    }

    Ok(())
}
