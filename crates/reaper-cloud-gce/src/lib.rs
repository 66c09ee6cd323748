//! Google Compute Engine client for the resource reaper
//!
//! This crate implements the ResourceClient trait for Compute Engine VM
//! instances, so the reaper can list and delete them per zone.
//!
//! # Requirements
//!
//! - `gcloud` CLI must be installed
//! - An active account must be configured (`gcloud auth login` or a service
//!   account activated with `gcloud auth activate-service-account`)
//!
//! # Example
//!
//! ```ignore
//! use reaper_cloud::ClientRegistry;
//!
//! let mut registry = ClientRegistry::new();
//! reaper_cloud_gce::register(&mut registry);
//! ```

pub mod client;
pub mod error;
pub mod gcloud;

pub use client::GceVmClient;
pub use error::{GceError, Result};
pub use gcloud::{ActiveAccount, Gcloud, InstanceInfo};

use reaper_cloud::{ClientRegistry, ResourceClient, ResourceType};
use std::sync::Arc;

/// Register every Compute Engine client with `registry`
pub fn register(registry: &mut ClientRegistry) {
    registry.register(ResourceType::GceVm, || {
        Arc::new(GceVmClient::new()) as Arc<dyn ResourceClient>
    });
}
