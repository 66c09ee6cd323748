//! Resource client trait definition

use crate::error::Result;
use crate::resource::{Resource, ResourceConfig, ResourceType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Capability contract for one resource type
///
/// Each provider binding (GCE VMs, ...) implements this trait so the reaper
/// can discover and reclaim resources without knowing the provider API.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// The resource type this client handles
    fn resource_type(&self) -> ResourceType;

    /// Establish credentials. Must succeed before list/delete are called.
    async fn authenticate(&self) -> Result<()>;

    /// List the resources in the configured zones that pass the config's
    /// name and skip filters
    async fn list_resources(
        &self,
        project_id: &str,
        config: &ResourceConfig,
    ) -> Result<Vec<Resource>>;

    /// Delete a single resource. The deletion does not have to be complete
    /// at the provider when this returns.
    async fn delete_resource(&self, project_id: &str, resource: &Resource) -> Result<()>;
}

/// Builds fresh clients for one resource type
pub trait ClientFactory: Send + Sync {
    fn create(&self) -> Arc<dyn ResourceClient>;
}

impl<F> ClientFactory for F
where
    F: Fn() -> Arc<dyn ResourceClient> + Send + Sync,
{
    fn create(&self) -> Arc<dyn ResourceClient> {
        self()
    }
}

/// Resource type → client factory mapping
///
/// Adding a resource type only means registering another factory here.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    factories: HashMap<ResourceType, Arc<dyn ClientFactory>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one for the same type
    pub fn register(
        &mut self,
        resource_type: ResourceType,
        factory: impl ClientFactory + 'static,
    ) -> &mut Self {
        if self
            .factories
            .insert(resource_type, Arc::new(factory))
            .is_some()
        {
            tracing::debug!("Replacing client factory for {}", resource_type);
        }
        self
    }

    /// Create a new, unauthenticated client for `resource_type`
    pub fn create(&self, resource_type: ResourceType) -> Option<Arc<dyn ResourceClient>> {
        self.factories.get(&resource_type).map(|f| f.create())
    }

    /// Registered resource types, sorted
    pub fn resource_types(&self) -> Vec<ResourceType> {
        let mut types: Vec<ResourceType> = self.factories.keys().copied().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("resource_types", &self.resource_types())
            .finish()
    }
}
