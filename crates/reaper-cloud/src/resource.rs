//! Provider-agnostic resource model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of cloud resource a client knows how to list and delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ResourceType {
    /// Compute Engine virtual machine instance
    GceVm,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::GceVm => write!(f, "gce_vm"),
        }
    }
}

/// A discovered cloud object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name, unique within its zone
    pub name: String,

    /// Zone the resource lives in
    pub zone: String,

    /// When the provider created the resource
    pub created_at: DateTime<Utc>,

    /// Kind of resource
    pub resource_type: ResourceType,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        zone: impl Into<String>,
        created_at: DateTime<Utc>,
        resource_type: ResourceType,
    ) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
            created_at,
            resource_type,
        }
    }
}

/// One query against one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type to query
    pub resource_type: ResourceType,

    /// Zones to list, in order
    #[serde(default)]
    pub zones: Vec<String>,

    /// Substring a resource name must contain (empty matches everything)
    #[serde(default)]
    pub name_filter: String,

    /// Substring that excludes a resource (empty excludes nothing)
    #[serde(default)]
    pub skip_filter: String,

    /// Cron expression whose next occurrence after creation is the deadline
    pub ttl: String,
}

impl ResourceConfig {
    pub fn new(resource_type: ResourceType, ttl: impl Into<String>) -> Self {
        Self {
            resource_type,
            zones: Vec::new(),
            name_filter: String::new(),
            skip_filter: String::new(),
            ttl: ttl.into(),
        }
    }

    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = filter.into();
        self
    }

    pub fn with_skip_filter(mut self, filter: impl Into<String>) -> Self {
        self.skip_filter = filter.into();
        self
    }

    /// Whether a resource name passes this config's filters
    pub fn matches(&self, name: &str) -> bool {
        crate::filter::should_watch(name, &self.name_filter, &self.skip_filter)
    }
}
