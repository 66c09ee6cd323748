//! Watchlist construction and deduplication
//!
//! A resource is identified by its zone and name. When more than one
//! resource configuration selects the same resource, the entry whose TTL
//! yields the later deletion time is kept.

use crate::error::ReaperError;
use crate::report::Failure;
use crate::watched::{DeadlineRule, WatchedResource};
use reaper_cloud::Resource;
use std::collections::HashMap;

/// Identity of a resource within one project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub zone: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(zone: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            name: name.into(),
        }
    }

    pub fn of(resource: &Resource) -> Self {
        Self::new(&resource.zone, &resource.name)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.zone, self.name)
    }
}

/// Pick the entry to keep when two configurations select the same resource
///
/// The later deletion time wins and a tie keeps `existing`. If either TTL
/// cannot produce a deletion time, `existing` is kept by the caller and the
/// error is returned so it can be reported.
pub fn merge(
    existing: &WatchedResource,
    incoming: &WatchedResource,
) -> Result<WatchedResource, ReaperError> {
    let ttl_error = |watched: &WatchedResource, source| ReaperError::TtlParse {
        resource: watched.to_string(),
        ttl: watched.ttl.clone(),
        source,
    };

    let current = existing
        .deletion_time()
        .map_err(|e| ttl_error(existing, e))?;
    let candidate = incoming
        .deletion_time()
        .map_err(|e| ttl_error(incoming, e))?;

    if candidate > current {
        Ok(incoming.clone())
    } else {
        Ok(existing.clone())
    }
}

/// Accumulates listing results into a deduplicated watchlist
#[derive(Debug, Default)]
pub struct WatchlistBuilder {
    entries: HashMap<ResourceKey, WatchedResource>,
    failures: Vec<Failure>,
    deadline: DeadlineRule,
}

impl WatchlistBuilder {
    pub fn new(deadline: DeadlineRule) -> Self {
        Self {
            entries: HashMap::new(),
            failures: Vec::new(),
            deadline,
        }
    }

    /// Add every resource of one listing under the given TTL
    pub fn watch(&mut self, resources: impl IntoIterator<Item = Resource>, ttl: &str) {
        for resource in resources {
            let watched = WatchedResource::new(resource, ttl).with_deadline(self.deadline);
            self.insert(watched);
        }
    }

    pub fn insert(&mut self, incoming: WatchedResource) {
        let key = incoming.key();
        let Some(existing) = self.entries.get(&key) else {
            tracing::debug!("Watching {}", incoming);
            self.entries.insert(key, incoming);
            return;
        };

        match merge(existing, &incoming) {
            Ok(kept) => {
                if kept.ttl != existing.ttl {
                    tracing::debug!("{} now uses TTL {:?}", kept, kept.ttl);
                }
                self.entries.insert(key, kept);
            }
            Err(e) => {
                let subject = key.to_string();
                tracing::warn!("Keeping earlier entry for {}: {}", subject, e);
                self.failures.push(Failure::new(subject, e));
            }
        }
    }

    /// The watchlist ordered by zone and name, plus merge failures
    pub fn finish(self) -> (Vec<WatchedResource>, Vec<Failure>) {
        let mut entries: Vec<WatchedResource> = self.entries.into_values().collect();
        entries.sort_by_key(|watched| watched.key());
        (entries, self.failures)
    }
}
