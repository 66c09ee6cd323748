//! Watched resources and deletion eligibility

use crate::schedule::{CronError, CronSchedule};
use crate::watchlist::ResourceKey;
use chrono::{DateTime, Utc};
use reaper_cloud::Resource;
use serde::{Deserialize, Serialize};

/// How a TTL's cron occurrence is anchored to the creation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineRule {
    /// The first occurrence strictly after creation
    #[default]
    StrictlyAfter,
    /// An occurrence on the creation second itself also counts
    AtOrAfter,
}

impl DeadlineRule {
    pub fn deadline(
        &self,
        schedule: &CronSchedule,
        created_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match self {
            DeadlineRule::StrictlyAfter => schedule.next_after(created_at),
            DeadlineRule::AtOrAfter => schedule.next_at_or_after(created_at),
        }
    }
}

/// A resource on the watchlist together with its TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedResource {
    pub resource: Resource,

    /// Cron expression; its next occurrence after creation is the deadline
    pub ttl: String,

    /// Frozen "now" used instead of the caller's instant, for tests
    pub frozen_at: Option<DateTime<Utc>>,

    pub deadline: DeadlineRule,
}

impl WatchedResource {
    pub fn new(resource: Resource, ttl: impl Into<String>) -> Self {
        Self {
            resource,
            ttl: ttl.into(),
            frozen_at: None,
            deadline: DeadlineRule::default(),
        }
    }

    pub fn with_deadline(mut self, deadline: DeadlineRule) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::of(&self.resource)
    }

    /// The absolute instant this resource becomes deletable
    pub fn deletion_time(&self) -> Result<DateTime<Utc>, CronError> {
        let schedule = CronSchedule::parse(&self.ttl)?;
        self.deadline
            .deadline(&schedule, self.resource.created_at)
            .ok_or_else(|| CronError::NoOccurrence {
                expr: self.ttl.clone(),
            })
    }

    /// The deletion time, once it has passed at `now` (or at the frozen instant)
    pub fn due_deletion(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, CronError> {
        let deletion_time = self.deletion_time()?;
        Ok((self.effective_now(now) >= deletion_time).then_some(deletion_time))
    }

    /// Whether the deadline has passed at `now` (or at the frozen instant)
    ///
    /// An unparseable TTL is never ready.
    pub fn is_ready_for_deletion(&self, now: DateTime<Utc>) -> bool {
        match self.due_deletion(now) {
            Ok(due) => due.is_some(),
            Err(e) => {
                tracing::warn!("{} stays watched: {}", self, e);
                false
            }
        }
    }

    pub fn freeze_clock(&mut self, instant: DateTime<Utc>) {
        self.frozen_at = Some(instant);
    }

    pub fn effective_now(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.frozen_at.unwrap_or(now)
    }
}

impl std::fmt::Display for WatchedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} in {}",
            self.resource.resource_type, self.resource.name, self.resource.zone
        )
    }
}
