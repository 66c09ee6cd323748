//! Resource Reaper core
//!
//! The reconciliation engine of the reaper. A [`Reaper`] owns the watchlist of
//! one cloud project and runs two operations against it:
//!
//! - **reconfigure**: query every configured resource type, merge the results
//!   into a deduplicated watchlist (the later deletion time wins), and apply
//!   the partial identity/schedule update carried by a [`ReaperConfig`].
//! - **sweep**: delete every watched resource whose TTL deadline has passed
//!   and prune it from the watchlist.
//!
//! Sweeps are gated by a cron [`CronSchedule`] through
//! [`Reaper::run_on_schedule`]; the time source is an injected [`Clock`] so
//! tests can freeze and advance time.
//!
//! ```ignore
//! use reaper_core::{CancelSignal, Reaper, ReaperConfig};
//!
//! let mut reaper = Reaper::with_system_clock(registry);
//! reaper.reconfigure(&config, &CancelSignal::never()).await?;
//! if let Some(report) = reaper.tick(&CancelSignal::never()).await? {
//!     println!("deleted {}", report.deleted.len());
//! }
//! ```

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod reaper;
pub mod report;
pub mod schedule;
pub mod watched;
pub mod watchlist;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use clock::{Clock, FrozenClock, SystemClock};
pub use config::ReaperConfig;
pub use error::{ReaperError, Result};
pub use reaper::{Reaper, ReaperState, SnapshotEntry, WatchlistSnapshot};
pub use report::{DeletionEvent, Failure, ReconfigureReport, SweepReport};
pub use schedule::{CronError, CronSchedule, parse_schedule, should_run};
pub use watched::{DeadlineRule, WatchedResource};
pub use watchlist::{ResourceKey, WatchlistBuilder, merge};

pub use reaper_cloud::{ClientRegistry, Resource, ResourceConfig, ResourceType};
