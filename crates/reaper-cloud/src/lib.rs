//! Resource Reaper cloud abstraction
//!
//! This crate defines the capability contract the reaper needs from a cloud
//! provider: authenticate, list the resources matching a query, and delete a
//! single resource. Concrete bindings live in their own crates
//! (e.g. `reaper-cloud-gce`) and plug in through a [`ClientRegistry`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  reaper-core                     │
//! │          (reconfigure / sweep / gate)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │  ResourceType → client
//! ┌─────────────────▼───────────────────────────────┐
//! │                 reaper-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait ResourceClient { ... }           │   │
//! │  │   ClientRegistry (type → factory)        │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Resource    │  │ Name filter  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │  gce (gcloud) │
//! └───────────────┘
//! ```

pub mod client;
pub mod error;
pub mod filter;
pub mod resource;

// Re-exports
pub use client::{ClientFactory, ClientRegistry, ResourceClient};
pub use error::{ClientError, Result};
pub use filter::should_watch;
pub use resource::{Resource, ResourceConfig, ResourceType};
