use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::provider::{CloudProvider, ProviderError};
use crate::resolver::ResourceKind;

/// One account-level resource, identified by provider ID and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: i64,
    pub name: String,
}

/// A location servers can be placed in.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub code: String,
    pub description: String,
}

/// A purchasable server type.
#[derive(Debug, Clone, Serialize)]
pub struct ServerType {
    pub name: String,
    pub architecture: Architecture,
}

/// An OS image. Only x86 images are eligible for provisioning.
#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub id: i64,
    pub name: String,
    pub architecture: Architecture,
}

/// CPU architecture as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    Arm,
    Unknown,
}

impl Architecture {
    /// Classify a provider-reported architecture string. Wording varies
    /// across providers and API versions, so matching is by substring.
    pub fn classify(raw: &str) -> Self {
        let a = raw.to_ascii_lowercase();
        if a.contains("x86") || a.contains("amd64") {
            Self::X86
        } else if a.contains("arm") {
            Self::Arm
        } else {
            Self::Unknown
        }
    }

    pub fn is_x86(self) -> bool {
        matches!(self, Self::X86)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X86 => "x86",
            Self::Arm => "arm",
            Self::Unknown => "unknown",
        })
    }
}

/// The catalog sections a snapshot carries, as addressed by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    Locations,
    ServerTypes,
    Images,
    Networks,
    SshKeys,
    Firewalls,
}

/// Immutable view of the account's resources from one provider query round.
///
/// Snapshots are built whole and published by [`ResourceCache`]; consumers
/// never observe a partially refreshed catalog.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pub locations: BTreeMap<String, Location>,
    pub server_types: BTreeMap<String, ServerType>,
    pub images: BTreeMap<String, Image>,
    pub networks: BTreeMap<i64, ResourceRef>,
    pub ssh_keys: BTreeMap<i64, ResourceRef>,
    pub firewalls: BTreeMap<i64, ResourceRef>,
}

impl CatalogSnapshot {
    fn from_parts(
        locations: Vec<Location>,
        server_types: Vec<ServerType>,
        images: Vec<Image>,
        networks: Vec<ResourceRef>,
        ssh_keys: Vec<ResourceRef>,
        firewalls: Vec<ResourceRef>,
    ) -> Self {
        Self {
            locations: locations.into_iter().map(|l| (l.code.clone(), l)).collect(),
            server_types: server_types
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            images: images.into_iter().map(|i| (i.name.clone(), i)).collect(),
            networks: networks.into_iter().map(|r| (r.id, r)).collect(),
            ssh_keys: ssh_keys.into_iter().map(|r| (r.id, r)).collect(),
            firewalls: firewalls.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Candidate pool for one selectable resource kind.
    pub fn selectable(&self, kind: ResourceKind) -> &BTreeMap<i64, ResourceRef> {
        match kind {
            ResourceKind::Network => &self.networks,
            ResourceKind::SshKey => &self.ssh_keys,
            ResourceKind::Firewall => &self.firewalls,
        }
    }

    /// Images eligible for provisioning, in name order.
    pub fn x86_images(&self) -> impl Iterator<Item = &Image> {
        self.images.values().filter(|i| i.architecture.is_x86())
    }

    pub fn has_server_type(&self, name: &str) -> bool {
        self.server_types.contains_key(name)
    }

    /// Per-section entry counts, reported after a refresh.
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            locations: self.locations.len(),
            server_types: self.server_types.len(),
            images: self.images.len(),
            x86_images: self.x86_images().count(),
            networks: self.networks.len(),
            ssh_keys: self.ssh_keys.len(),
            firewalls: self.firewalls.len(),
        }
    }

    /// One catalog section in a shape the surface can render directly.
    /// The images section only shows the x86-eligible set.
    pub fn listing(&self, kind: CatalogKind) -> CatalogListing {
        match kind {
            CatalogKind::Locations => {
                CatalogListing::Locations(self.locations.values().cloned().collect())
            }
            CatalogKind::ServerTypes => {
                CatalogListing::ServerTypes(self.server_types.values().cloned().collect())
            }
            CatalogKind::Images => {
                CatalogListing::Images(self.x86_images().cloned().collect())
            }
            CatalogKind::Networks => {
                CatalogListing::Networks(self.networks.values().cloned().collect())
            }
            CatalogKind::SshKeys => {
                CatalogListing::SshKeys(self.ssh_keys.values().cloned().collect())
            }
            CatalogKind::Firewalls => {
                CatalogListing::Firewalls(self.firewalls.values().cloned().collect())
            }
        }
    }
}

/// Entry counts per catalog section.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogSummary {
    pub locations: usize,
    pub server_types: usize,
    pub images: usize,
    pub x86_images: usize,
    pub networks: usize,
    pub ssh_keys: usize,
    pub firewalls: usize,
}

/// Serializes as `{"kind": "...", "items": [...]}`.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "kebab-case")]
pub enum CatalogListing {
    Locations(Vec<Location>),
    ServerTypes(Vec<ServerType>),
    Images(Vec<Image>),
    Networks(Vec<ResourceRef>),
    SshKeys(Vec<ResourceRef>),
    Firewalls(Vec<ResourceRef>),
}

/// Refreshable holder of the current [`CatalogSnapshot`].
///
/// A refresh builds the complete replacement snapshot before swapping it in,
/// so readers always see either the previous snapshot or the new one. A
/// failed refresh leaves the published snapshot untouched.
pub struct ResourceCache {
    provider: Arc<dyn CloudProvider>,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl ResourceCache {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
        }
    }

    /// Last successfully published snapshot, `None` before the first refresh.
    pub async fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().await.clone()
    }

    /// Query every catalog section and publish a fresh snapshot.
    ///
    /// The section queries run concurrently and join all-or-nothing: if any
    /// of them fails, nothing is published and the error is returned.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, ProviderError> {
        let (locations, server_types, images, networks, ssh_keys, firewalls) = tokio::try_join!(
            self.provider.locations(),
            self.provider.server_types(),
            self.provider.images(),
            self.provider.networks(),
            self.provider.ssh_keys(),
            self.provider.firewalls(),
        )?;

        let snapshot = Arc::new(CatalogSnapshot::from_parts(
            locations,
            server_types,
            images,
            networks,
            ssh_keys,
            firewalls,
        ));

        *self.current.write().await = Some(snapshot.clone());
        tracing::info!(summary = ?snapshot.summary(), "catalog refreshed");
        Ok(snapshot)
    }

    /// Current snapshot, refreshing first if none has been published yet.
    pub async fn ensure(&self) -> Result<Arc<CatalogSnapshot>, ProviderError> {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        self.refresh().await
    }
}
