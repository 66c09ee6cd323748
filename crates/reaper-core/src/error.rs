//! Reaper error types

use crate::schedule::CronError;
use reaper_cloud::{ClientError, ResourceType};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaperError {
    #[error("{resource_type} client failed to authenticate: {source}")]
    Authentication {
        resource_type: ResourceType,
        source: ClientError,
    },

    #[error("{resource_type} client failed to list resources: {source}")]
    ListResources {
        resource_type: ResourceType,
        source: ClientError,
    },

    #[error("{resource_type} client failed to delete {name} in {zone}: {source}")]
    DeleteResource {
        resource_type: ResourceType,
        name: String,
        zone: String,
        source: ClientError,
    },

    #[error("Invalid schedule {expr:?}: {source}")]
    ScheduleParse { expr: String, source: CronError },

    #[error("Invalid TTL {ttl:?} for {resource}: {source}")]
    TtlParse {
        resource: String,
        ttl: String,
        source: CronError,
    },

    #[error("No client registered for resource type {0}")]
    NoClient(ResourceType),

    #[error("{0} client unavailable after an earlier failure in this run")]
    ClientUnavailable(ResourceType),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Project ID is not configured")]
    MissingProjectId,
}

impl ReaperError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReaperError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ReaperError>;
