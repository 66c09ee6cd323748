use crate::watched::WatchedResource;
use chrono::{DateTime, Utc};
use reaper_cloud::ResourceType;
use serde::Serialize;

/// Read-only view of a reaper taken between operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistSnapshot {
    pub uuid: Option<String>,
    pub project_id: Option<String>,
    pub schedule: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub zone: String,
    pub resource_type: ResourceType,
    pub ttl: String,
    pub created_at: DateTime<Utc>,
    /// `None` when the TTL yields no deadline
    pub deletion_time: Option<DateTime<Utc>>,
    pub ready: bool,
}

impl SnapshotEntry {
    pub(super) fn capture(watched: &WatchedResource, now: DateTime<Utc>) -> Self {
        let deletion_time = watched.deletion_time().ok();
        Self {
            name: watched.resource.name.clone(),
            zone: watched.resource.zone.clone(),
            resource_type: watched.resource.resource_type,
            ttl: watched.ttl.clone(),
            created_at: watched.resource.created_at,
            deletion_time,
            ready: matches!(watched.due_deletion(now), Ok(Some(_))),
        }
    }
}

impl WatchlistSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

impl std::fmt::Display for WatchlistSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{} in {}", e.name, e.zone))
            .collect();
        write!(f, "Watchlist: {}", entries.join(", "))
    }
}
