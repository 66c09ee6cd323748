//! The per-project reaper state machine

mod snapshot;

#[cfg(test)]
mod tests;

pub use snapshot::{SnapshotEntry, WatchlistSnapshot};

use crate::cancel::CancelSignal;
use crate::clock::{Clock, SystemClock};
use crate::config::ReaperConfig;
use crate::error::{ReaperError, Result};
use crate::report::{DeletionEvent, ReconfigureReport, SweepReport};
use crate::schedule::{CronSchedule, should_run};
use crate::watched::{DeadlineRule, WatchedResource};
use crate::watchlist::{ResourceKey, WatchlistBuilder};
use chrono::{DateTime, Utc};
use reaper_cloud::{ClientError, ClientRegistry, ResourceClient, ResourceType};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a reaper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    /// No project or no valid schedule yet
    Unconfigured,
    /// A project and schedule are set; the watchlist reflects the last reconfigure
    Configured,
}

/// Reclaims expired resources of one cloud project
///
/// Operations take `&mut self`, so a reaper runs one reconfigure or sweep
/// at a time. Independent reapers share nothing and can run concurrently.
#[derive(Debug)]
pub struct Reaper {
    uuid: Option<String>,
    project_id: Option<String>,
    watchlist: Vec<WatchedResource>,
    schedule: Option<CronSchedule>,
    last_run: Option<DateTime<Utc>>,
    deadline: DeadlineRule,
    clock: Arc<dyn Clock>,
    clients: ClientRegistry,
    call_timeout: Option<Duration>,
}

impl Reaper {
    pub fn new(clients: ClientRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            uuid: None,
            project_id: None,
            watchlist: Vec::new(),
            schedule: None,
            last_run: None,
            deadline: DeadlineRule::default(),
            clock,
            clients,
            call_timeout: None,
        }
    }

    pub fn with_system_clock(clients: ClientRegistry) -> Self {
        Self::new(clients, Arc::new(SystemClock))
    }

    /// Bound every provider call (authenticate, list, delete)
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn schedule(&self) -> Option<&CronSchedule> {
        self.schedule.as_ref()
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn deadline(&self) -> DeadlineRule {
        self.deadline
    }

    pub fn watchlist(&self) -> &[WatchedResource] {
        &self.watchlist
    }

    pub fn state(&self) -> ReaperState {
        if self.project_id.is_some() && self.schedule.is_some() {
            ReaperState::Configured
        } else {
            ReaperState::Unconfigured
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether the schedule gate is open at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        should_run(self.schedule.as_ref(), self.last_run, now)
    }

    /// Freeze the eligibility clock of every watched resource
    ///
    /// Entries added by a later reconfigure are not frozen.
    pub fn freeze_time(&mut self, instant: DateTime<Utc>) {
        for watched in &mut self.watchlist {
            watched.freeze_clock(instant);
        }
    }

    /// Rebuild the watchlist and apply the partial update in `config`
    ///
    /// Absent or empty identity and schedule fields leave the current value
    /// in place. Per resource type failures, including a still unknown
    /// project id, are collected in the report and the remaining
    /// configurations still contribute. Nothing is committed
    /// unless the whole rebuild completes; on cancellation the previous
    /// identity, schedule and watchlist stay as they were.
    pub async fn reconfigure(
        &mut self,
        config: &ReaperConfig,
        cancel: &CancelSignal,
    ) -> Result<ReconfigureReport> {
        let started = Instant::now();
        let project_id = present(&config.project_id)
            .or(self.project_id.as_deref())
            .map(str::to_string);
        let uuid = present(&config.uuid).map(str::to_string);
        let schedule_expr = present(&config.schedule);
        let deadline = config.deadline.unwrap_or(self.deadline);

        let mut report = ReconfigureReport::default();
        let schedule = match schedule_expr {
            Some(expr) => match CronSchedule::parse(expr) {
                Ok(schedule) => Some(schedule),
                Err(source) => {
                    report.add_failure(
                        "schedule",
                        ReaperError::ScheduleParse {
                            expr: expr.to_string(),
                            source,
                        },
                    );
                    None
                }
            },
            None => self.schedule.clone(),
        };

        let mut cancel = cancel.clone();
        let mut cache = ClientCache::new(&self.clients, self.call_timeout);
        let mut builder = WatchlistBuilder::new(deadline);

        for resource_config in &config.resources {
            if cancel.is_cancelled() {
                return Err(ReaperError::Cancelled);
            }

            let resource_type = resource_config.resource_type;
            let subject = format!("{} {}", resource_type, resource_config.zones.join(","));

            let Some(project_id) = project_id.as_deref() else {
                report.add_failure(subject, ReaperError::MissingProjectId);
                continue;
            };

            let client = match cache.get(resource_type, &mut cancel).await {
                Ok(client) => client,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    report.add_failure(subject, e);
                    continue;
                }
            };

            let listing = guarded_call(
                self.call_timeout,
                &mut cancel,
                client.list_resources(project_id, resource_config),
            )
            .await;

            match listing {
                Ok(resources) => {
                    tracing::debug!("{}: {} resources selected", subject, resources.len());
                    builder.watch(resources, &resource_config.ttl);
                }
                Err(CallError::Cancelled) => return Err(ReaperError::Cancelled),
                Err(e) => {
                    let error = e.into_error("list resources", |source| {
                        ReaperError::ListResources {
                            resource_type,
                            source,
                        }
                    });
                    report.add_failure(subject, error);
                }
            }
        }

        let (watchlist, merge_failures) = builder.finish();
        report.failures.extend(merge_failures);

        self.project_id = project_id;
        if uuid.is_some() {
            self.uuid = uuid;
        }
        if schedule_expr.is_some() {
            self.schedule = schedule;
        }
        self.deadline = deadline;
        self.watchlist = watchlist;

        report.watched = self.watchlist.len();
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            "Reaper {} watching {} resources ({} failures)",
            self.label(),
            report.watched,
            report.failures.len()
        );

        Ok(report)
    }

    /// Delete every watched resource whose deadline has passed at `now`
    ///
    /// Deleted resources are pruned; failed deletions and malformed TTLs
    /// stay on the watchlist and are reported. A cancelled sweep leaves the
    /// watchlist unchanged.
    pub async fn sweep(&mut self, now: DateTime<Utc>, cancel: &CancelSignal) -> Result<SweepReport> {
        let started = Instant::now();
        let mut report = SweepReport::default();
        let mut cancel = cancel.clone();
        let mut cache = ClientCache::new(&self.clients, self.call_timeout);
        let mut deleted: HashSet<ResourceKey> = HashSet::new();

        for watched in &self.watchlist {
            if cancel.is_cancelled() {
                return Err(ReaperError::Cancelled);
            }

            let deletion_time = match watched.due_deletion(now) {
                Ok(Some(deletion_time)) => deletion_time,
                Ok(None) => continue,
                Err(source) => {
                    report.add_failure(
                        watched.key().to_string(),
                        ReaperError::TtlParse {
                            resource: watched.to_string(),
                            ttl: watched.ttl.clone(),
                            source,
                        },
                    );
                    continue;
                }
            };

            let Some(project_id) = self.project_id.as_deref() else {
                report.add_failure(watched.key().to_string(), ReaperError::MissingProjectId);
                continue;
            };

            let resource = &watched.resource;
            let client = match cache.get(resource.resource_type, &mut cancel).await {
                Ok(client) => client,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    report.add_failure(watched.key().to_string(), e);
                    continue;
                }
            };

            let outcome = guarded_call(
                self.call_timeout,
                &mut cancel,
                client.delete_resource(project_id, resource),
            )
            .await;

            match outcome {
                Ok(()) => {
                    tracing::info!("Deleted {} (TTL {:?} expired at {})", watched, watched.ttl, deletion_time);
                    deleted.insert(watched.key());
                    report.deleted.push(DeletionEvent {
                        resource_type: resource.resource_type,
                        name: resource.name.clone(),
                        zone: resource.zone.clone(),
                        ttl: watched.ttl.clone(),
                        deletion_time,
                        deleted_at: self.clock.now(),
                    });
                }
                Err(CallError::Cancelled) => return Err(ReaperError::Cancelled),
                Err(e) => {
                    let error = e.into_error("delete resource", |source| {
                        ReaperError::DeleteResource {
                            resource_type: resource.resource_type,
                            name: resource.name.clone(),
                            zone: resource.zone.clone(),
                            source,
                        }
                    });
                    report.add_failure(watched.key().to_string(), error);
                }
            }
        }

        self.watchlist.retain(|watched| !deleted.contains(&watched.key()));
        report.retained = self.watchlist.len();
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            "Reaper {} swept: {} deleted, {} retained",
            self.label(),
            report.deleted.len(),
            report.retained
        );

        Ok(report)
    }

    /// Sweep if the schedule gate is open at `now`
    ///
    /// `last_run` only advances when the sweep completes.
    pub async fn run_on_schedule(
        &mut self,
        now: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> Result<Option<SweepReport>> {
        if !self.is_due(now) {
            tracing::debug!("Reaper {} not due at {}", self.label(), now);
            return Ok(None);
        }

        let report = self.sweep(now, cancel).await?;
        self.last_run = Some(now);
        Ok(Some(report))
    }

    /// [`Reaper::run_on_schedule`] at the clock's current time
    pub async fn tick(&mut self, cancel: &CancelSignal) -> Result<Option<SweepReport>> {
        let now = self.clock.now();
        self.run_on_schedule(now, cancel).await
    }

    /// A detached copy of the watchlist for status displays
    pub fn snapshot(&self) -> WatchlistSnapshot {
        let taken_at = self.clock.now();
        WatchlistSnapshot {
            uuid: self.uuid.clone(),
            project_id: self.project_id.clone(),
            schedule: self.schedule.as_ref().map(|s| s.expression().to_string()),
            last_run: self.last_run,
            taken_at,
            entries: self
                .watchlist
                .iter()
                .map(|watched| SnapshotEntry::capture(watched, taken_at))
                .collect(),
        }
    }

    fn label(&self) -> &str {
        self.uuid
            .as_deref()
            .or(self.project_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// A configuration field that is set and non-empty
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Authenticated clients for the duration of one operation
///
/// Each resource type is authenticated at most once; a type whose client
/// is missing or failed to authenticate is skipped for the rest of the run.
struct ClientCache<'a> {
    registry: &'a ClientRegistry,
    timeout: Option<Duration>,
    ready: HashMap<ResourceType, Arc<dyn ResourceClient>>,
    unavailable: HashSet<ResourceType>,
}

impl<'a> ClientCache<'a> {
    fn new(registry: &'a ClientRegistry, timeout: Option<Duration>) -> Self {
        Self {
            registry,
            timeout,
            ready: HashMap::new(),
            unavailable: HashSet::new(),
        }
    }

    async fn get(
        &mut self,
        resource_type: ResourceType,
        cancel: &mut CancelSignal,
    ) -> Result<Arc<dyn ResourceClient>> {
        if let Some(client) = self.ready.get(&resource_type) {
            return Ok(Arc::clone(client));
        }
        if self.unavailable.contains(&resource_type) {
            return Err(ReaperError::ClientUnavailable(resource_type));
        }

        let Some(client) = self.registry.create(resource_type) else {
            self.unavailable.insert(resource_type);
            return Err(ReaperError::NoClient(resource_type));
        };

        match guarded_call(self.timeout, cancel, client.authenticate()).await {
            Ok(()) => {
                tracing::debug!("{} client authenticated", resource_type);
                self.ready.insert(resource_type, Arc::clone(&client));
                Ok(client)
            }
            Err(CallError::Cancelled) => Err(ReaperError::Cancelled),
            Err(e) => {
                self.unavailable.insert(resource_type);
                Err(e.into_error("authenticate", |source| {
                    ReaperError::Authentication {
                        resource_type,
                        source,
                    }
                }))
            }
        }
    }
}

/// Why a guarded provider call did not produce a value
#[derive(Debug)]
enum CallError {
    Client(ClientError),
    Timeout(Duration),
    Cancelled,
}

impl CallError {
    fn into_error(
        self,
        operation: &str,
        wrap: impl FnOnce(ClientError) -> ReaperError,
    ) -> ReaperError {
        match self {
            CallError::Client(source) => wrap(source),
            CallError::Timeout(after) => ReaperError::Timeout {
                operation: operation.to_string(),
                after,
            },
            CallError::Cancelled => ReaperError::Cancelled,
        }
    }
}

/// Run a provider call, abandoning it on cancellation or timeout
///
/// Abandoning drops the call's future, which cancels whatever it had in
/// flight.
async fn guarded_call<T, F>(
    timeout: Option<Duration>,
    cancel: &mut CancelSignal,
    call: F,
) -> std::result::Result<T, CallError>
where
    F: Future<Output = reaper_cloud::Result<T>>,
{
    let guarded = async {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CallError::Cancelled),
            result = call => result.map_err(CallError::Client),
        }
    };

    match timeout {
        Some(after) => tokio::time::timeout(after, guarded)
            .await
            .unwrap_or_else(|_| Err(CallError::Timeout(after))),
        None => guarded.await,
    }
}
