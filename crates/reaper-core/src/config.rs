//! Reconfigure input

use crate::watched::DeadlineRule;
use reaper_cloud::ResourceConfig;
use serde::{Deserialize, Serialize};

/// A partial update applied by [`crate::Reaper::reconfigure`]
///
/// `None` leaves the reaper's current value unchanged. `resources` always
/// replaces the query set: the watchlist is rebuilt from exactly these
/// configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaperConfig {
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    /// Cron expression gating sweeps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// How TTL deadlines are anchored to creation times
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DeadlineRule>,
}

impl ReaperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: ResourceConfig) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DeadlineRule) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Name used in logs: the uuid, else the project, else a placeholder
    pub fn label(&self) -> &str {
        [&self.uuid, &self.project_id]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|value| !value.is_empty())
            .unwrap_or("<unnamed>")
    }
}
