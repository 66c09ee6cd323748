//! Outcome reports for reconfigure and sweep

use crate::error::ReaperError;
use chrono::{DateTime, Utc};
use reaper_cloud::ResourceType;
use serde::Serialize;

/// One error that did not stop the surrounding operation
#[derive(Debug)]
pub struct Failure {
    /// What was being worked on, e.g. `gce_vm us-east1-b` or `us-east1-b/vm-1`
    pub subject: String,
    pub error: ReaperError,
}

impl Failure {
    pub fn new(subject: impl Into<String>, error: ReaperError) -> Self {
        Self {
            subject: subject.into(),
            error,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.error)
    }
}

/// A resource removed by a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionEvent {
    pub resource_type: ResourceType,
    pub name: String,
    pub zone: String,
    pub ttl: String,
    pub deletion_time: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
}

/// Result of a reconfigure
#[derive(Debug, Default)]
pub struct ReconfigureReport {
    /// Size of the committed watchlist
    pub watched: usize,
    pub failures: Vec<Failure>,
    pub duration_ms: u64,
}

impl ReconfigureReport {
    pub fn add_failure(&mut self, subject: impl Into<String>, error: ReaperError) {
        let failure = Failure::new(subject, error);
        tracing::warn!("Reconfigure: {}", failure);
        self.failures.push(failure);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a sweep
#[derive(Debug, Default)]
pub struct SweepReport {
    pub deleted: Vec<DeletionEvent>,
    /// Watchlist size after pruning
    pub retained: usize,
    pub failures: Vec<Failure>,
    pub duration_ms: u64,
}

impl SweepReport {
    pub fn add_failure(&mut self, subject: impl Into<String>, error: ReaperError) {
        let failure = Failure::new(subject, error);
        tracing::warn!("Sweep: {}", failure);
        self.failures.push(failure);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
