//! Resolution and provisioning core.
//!
//! This crate holds the domain logic of the service: the refreshable catalog
//! cache, the resource resolver, cloud-init app profiles, and the batch
//! provisioning pipeline. It reaches the outside world only through the
//! [`provider::CloudProvider`] and [`store::PreferenceStore`] traits, which
//! the infra and db crates implement.

pub mod catalog;
pub mod cloudinit;
pub mod provider;
pub mod provision;
pub mod resolver;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{CatalogSnapshot, ResourceCache, ResourceRef};
pub use cloudinit::AppProfile;
pub use provider::CloudProvider;
pub use provision::{CreateRequest, Provisioner, ProvisionerConfig};
pub use resolver::{ResolveError, ResourceKind, resolve};
pub use store::{MemoryStore, PreferenceStore};
