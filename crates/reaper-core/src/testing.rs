//! In-memory provider used by the reaper tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reaper_cloud::{
    ClientError, ClientRegistry, Resource, ResourceClient, ResourceConfig, ResourceType,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE_B: &str = "us-east1-b";
pub const ZONE_C: &str = "us-east1-c";

pub fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap()
}

/// Provider state shared between the test and every client the registry hands out
#[derive(Debug, Default)]
pub struct FakeState {
    pub resources: Mutex<Vec<Resource>>,
    pub failing_zones: Mutex<HashSet<String>>,
    pub failing_deletes: Mutex<HashSet<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_auth: AtomicBool,
    pub hang: AtomicBool,
    pub auth_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl FakeState {
    pub fn with_resources(names: &[(&str, &str)]) -> Arc<Self> {
        let state = Self::default();
        *state.resources.lock().unwrap() = names
            .iter()
            .map(|(name, zone)| Resource::new(*name, *zone, created(), ResourceType::GceVm))
            .collect();
        Arc::new(state)
    }

    pub fn fail_zone(&self, zone: &str) {
        self.failing_zones.lock().unwrap().insert(zone.to_string());
    }

    pub fn fail_delete(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }

    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug)]
pub struct FakeClient {
    state: Arc<FakeState>,
}

#[async_trait]
impl ResourceClient for FakeClient {
    fn resource_type(&self) -> ResourceType {
        ResourceType::GceVm
    }

    async fn authenticate(&self) -> reaper_cloud::Result<()> {
        self.state.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_auth.load(Ordering::SeqCst) {
            return Err(ClientError::AuthenticationFailed("no credentials".into()));
        }
        Ok(())
    }

    async fn list_resources(
        &self,
        _project_id: &str,
        config: &ResourceConfig,
    ) -> reaper_cloud::Result<Vec<Resource>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        self.state.maybe_hang().await;

        let failing = self.state.failing_zones.lock().unwrap().clone();
        if let Some(zone) = config.zones.iter().find(|z| failing.contains(*z)) {
            return Err(ClientError::ApiError(format!("zone {} unavailable", zone)));
        }

        let resources = self.state.resources.lock().unwrap();
        Ok(config
            .zones
            .iter()
            .flat_map(|zone| resources.iter().filter(move |r| &r.zone == zone))
            .filter(|r| config.matches(&r.name))
            .cloned()
            .collect())
    }

    async fn delete_resource(
        &self,
        _project_id: &str,
        resource: &Resource,
    ) -> reaper_cloud::Result<()> {
        self.state.maybe_hang().await;

        if self.state.failing_deletes.lock().unwrap().contains(&resource.name) {
            return Err(ClientError::ApiError(format!(
                "cannot delete {}",
                resource.name
            )));
        }

        self.state
            .resources
            .lock()
            .unwrap()
            .retain(|r| !(r.name == resource.name && r.zone == resource.zone));
        self.state.deleted.lock().unwrap().push(resource.name.clone());
        Ok(())
    }
}

pub fn registry(state: &Arc<FakeState>) -> ClientRegistry {
    let state = Arc::clone(state);
    let mut registry = ClientRegistry::new();
    registry.register(ResourceType::GceVm, move || {
        Arc::new(FakeClient {
            state: Arc::clone(&state),
        }) as Arc<dyn ResourceClient>
    });
    registry
}
