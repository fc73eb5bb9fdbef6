//! The seam between domain logic and the cloud API.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{Image, Location, ResourceRef, ServerType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("provider api error: {0}")]
    Api(String),
    #[error("cloud account resource limit reached")]
    ResourceLimit,
    #[error("server {0} not found")]
    ServerNotFound(i64),
}

/// Everything needed to create one server.
#[derive(Debug, Clone)]
pub struct CreateSpec {
    pub name: String,
    pub server_type: String,
    pub image: String,
    pub location: String,
    pub network_id: i64,
    pub ssh_key_id: i64,
    pub firewall_id: i64,
    pub user_data: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Identity of a freshly created server, before it has settled.
#[derive(Debug, Clone)]
pub struct CreatedServer {
    pub id: i64,
    pub name: String,
}

/// Point-in-time view of a running (or starting) server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerDetails {
    pub id: i64,
    pub name: String,
    pub status: ServerStatus,
    pub server_type: String,
    pub datacenter: String,
    pub location: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Initializing,
    Starting,
    Off,
    Stopping,
    Deleting,
    Unknown,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Initializing => "initializing",
            Self::Starting => "starting",
            Self::Off => "off",
            Self::Stopping => "stopping",
            Self::Deleting => "deleting",
            Self::Unknown => "unknown",
        })
    }
}

/// A cloud account the service provisions into.
///
/// Implementations translate to one concrete API; everything above this
/// trait stays provider-agnostic.
#[async_trait]
pub trait CloudProvider: Send + Sync + 'static {
    /// All locations available to the account.
    async fn locations(&self) -> Result<Vec<Location>, ProviderError>;

    /// All purchasable server types.
    async fn server_types(&self) -> Result<Vec<ServerType>, ProviderError>;

    /// All images visible to the account, any architecture.
    async fn images(&self) -> Result<Vec<Image>, ProviderError>;

    /// Private networks on the account.
    async fn networks(&self) -> Result<Vec<ResourceRef>, ProviderError>;

    /// SSH keys registered on the account.
    async fn ssh_keys(&self) -> Result<Vec<ResourceRef>, ProviderError>;

    /// Firewalls configured on the account.
    async fn firewalls(&self) -> Result<Vec<ResourceRef>, ProviderError>;

    /// How many more servers the account may create, if the provider
    /// exposes that number. `Ok(None)` means unknown.
    async fn quota_remaining(&self) -> Result<Option<i64>, ProviderError>;

    /// Create one server and return its identity immediately. The server
    /// will still be booting when this returns.
    async fn create_server(&self, spec: &CreateSpec) -> Result<CreatedServer, ProviderError>;

    /// Fetch the current state of a server by ID.
    async fn server_details(&self, id: i64) -> Result<ServerDetails, ProviderError>;
}
