//! Compute Engine VM client implementation

use crate::gcloud::{Gcloud, InstanceInfo};
use async_trait::async_trait;
use reaper_cloud::{ClientError, Resource, ResourceClient, ResourceConfig, ResourceType};
use std::sync::atomic::{AtomicBool, Ordering};

/// Compute Engine VM instance client
pub struct GceVmClient {
    gcloud: Gcloud,
    authenticated: AtomicBool,
}

impl GceVmClient {
    pub fn new() -> Self {
        Self::with_gcloud(Gcloud::new())
    }

    pub fn with_gcloud(gcloud: Gcloud) -> Self {
        Self {
            gcloud,
            authenticated: AtomicBool::new(false),
        }
    }

    fn ensure_authenticated(&self) -> reaper_cloud::Result<()> {
        if self.authenticated.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }
}

impl Default for GceVmClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert the instances of one zone into filtered resources
///
/// The zone reported by gcloud wins over the queried one. Instances without
/// a parseable creation time are skipped: a resource that cannot be dated
/// can never become eligible.
fn to_resources(zone: &str, instances: Vec<InstanceInfo>, config: &ResourceConfig) -> Vec<Resource> {
    instances
        .into_iter()
        .filter(|instance| config.matches(&instance.name))
        .filter_map(|instance| {
            let zone = instance.zone_name().unwrap_or(zone).to_string();
            match instance.created_at() {
                Some(created_at) => Some(Resource::new(
                    instance.name,
                    zone,
                    created_at,
                    ResourceType::GceVm,
                )),
                None => {
                    tracing::warn!(
                        "Skipping instance {} in {}: unparseable creation timestamp {:?}",
                        instance.name,
                        zone,
                        instance.creation_timestamp
                    );
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl ResourceClient for GceVmClient {
    fn resource_type(&self) -> ResourceType {
        ResourceType::GceVm
    }

    async fn authenticate(&self) -> reaper_cloud::Result<()> {
        let account = self.gcloud.check_auth().await?;
        tracing::debug!("gcloud authenticated as {}", account.account);
        self.authenticated.store(true, Ordering::Release);
        Ok(())
    }

    async fn list_resources(
        &self,
        project_id: &str,
        config: &ResourceConfig,
    ) -> reaper_cloud::Result<Vec<Resource>> {
        self.ensure_authenticated()?;

        if config.zones.is_empty() {
            return Err(ClientError::InvalidConfig(
                "no zones configured for gce_vm".to_string(),
            ));
        }

        let mut resources = Vec::new();
        for zone in &config.zones {
            let instances = self.gcloud.list_instances(project_id, zone).await?;
            resources.extend(to_resources(zone, instances, config));
        }
        Ok(resources)
    }

    async fn delete_resource(
        &self,
        project_id: &str,
        resource: &Resource,
    ) -> reaper_cloud::Result<()> {
        self.ensure_authenticated()?;
        self.gcloud
            .delete_instance(project_id, &resource.zone, &resource.name)
            .await?;
        tracing::debug!(
            "Requested deletion of instance {} in {}",
            resource.name,
            resource.zone
        );
        Ok(())
    }
}
