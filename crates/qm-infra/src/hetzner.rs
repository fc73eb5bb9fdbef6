use async_trait::async_trait;
use hcloud::apis::configuration::Configuration;
use hcloud::apis::{
    firewalls_api, images_api, locations_api, networks_api, server_types_api, servers_api,
    ssh_keys_api,
};
use hcloud::models;
use serde::Serialize;
use tracing::info;

use qm_core::catalog::{Architecture, Image, Location, ResourceRef, ServerType};
use qm_core::provider::{
    CloudProvider, CreateSpec, CreatedServer, ProviderError, ServerDetails, ServerStatus,
};

use crate::SetupError;

const PAGE_SIZE: usize = 50;

/// Error-body markers Hetzner uses when the account hits its server cap.
const LIMIT_MARKERS: [&str; 3] = [
    "resource_limit_exceeded",
    "server limit reached",
    "limit reached",
];

/// Hetzner Cloud provider using the `hcloud` crate.
pub struct HetznerProvider {
    config: Configuration,
}

impl HetznerProvider {
    /// Create from env vars:
    ///
    /// - `HCLOUD_TOKEN` (required)
    pub fn from_env() -> Result<Self, SetupError> {
        dotenvy::dotenv().ok();

        let token = std::env::var("HCLOUD_TOKEN")
            .map_err(|_| SetupError::MissingEnv("HCLOUD_TOKEN".into()))?;
        Ok(Self::with_token(token))
    }

    pub fn with_token(token: String) -> Self {
        let mut config = Configuration::new();
        config.bearer_access_token = Some(token);
        Self { config }
    }

    fn parse_status(status: &models::server::Status) -> ServerStatus {
        match status {
            models::server::Status::Running => ServerStatus::Running,
            models::server::Status::Initializing => ServerStatus::Initializing,
            models::server::Status::Starting => ServerStatus::Starting,
            models::server::Status::Off => ServerStatus::Off,
            models::server::Status::Stopping => ServerStatus::Stopping,
            models::server::Status::Deleting => ServerStatus::Deleting,
            _ => ServerStatus::Unknown,
        }
    }

    fn details_of(server: &models::Server) -> ServerDetails {
        ServerDetails {
            id: server.id,
            name: server.name.clone(),
            status: Self::parse_status(&server.status),
            server_type: server.server_type.name.clone(),
            datacenter: server.datacenter.name.clone(),
            location: server.datacenter.location.name.clone(),
            ipv4: server.public_net.ipv4.as_ref().map(|ip| ip.ip.clone()),
            ipv6: server.public_net.ipv6.as_ref().map(|ip| ip.ip.clone()),
            image: server.image.as_ref().and_then(|img| img.name.clone()),
        }
    }

    /// Snapshots and backups carry no name; only named images are usable.
    fn named_image(raw: models::Image) -> Option<Image> {
        let architecture = Architecture::classify(&architecture_label(&raw.architecture));
        let id = raw.id;
        raw.name.map(|name| Image {
            id,
            name,
            architecture,
        })
    }

    fn classify_create<T>(e: hcloud::apis::Error<T>) -> ProviderError {
        if let hcloud::apis::Error::ResponseError(content) = &e {
            let body = content.content.to_lowercase();
            if LIMIT_MARKERS.iter().any(|marker| body.contains(marker)) {
                return ProviderError::ResourceLimit;
            }
        }
        ProviderError::Api(format!("create server: {e}"))
    }

    fn response_status<T>(e: &hcloud::apis::Error<T>) -> Option<u16> {
        match e {
            hcloud::apis::Error::ResponseError(content) => Some(content.status.as_u16()),
            _ => None,
        }
    }

    async fn fetch_locations(&self) -> Result<Vec<models::Location>, ProviderError> {
        let mut all = Vec::new();
        let mut page: i64 = 1;
        loop {
            let resp = locations_api::list_locations(
                &self.config,
                locations_api::ListLocationsParams {
                    page: Some(page as _),
                    per_page: Some(PAGE_SIZE as _),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ProviderError::Api(format!("list locations: {e}")))?;
            let last = resp.locations.len() < PAGE_SIZE;
            all.extend(resp.locations);
            if last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn fetch_server_types(&self) -> Result<Vec<models::ServerType>, ProviderError> {
        let mut all = Vec::new();
        let mut page: i64 = 1;
        loop {
            let resp = server_types_api::list_server_types(
                &self.config,
                server_types_api::ListServerTypesParams {
                    page: Some(page as _),
                    per_page: Some(PAGE_SIZE as _),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ProviderError::Api(format!("list server types: {e}")))?;
            let last = resp.server_types.len() < PAGE_SIZE;
            all.extend(resp.server_types);
            if last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn fetch_images(&self) -> Result<Vec<models::Image>, ProviderError> {
        let mut all = Vec::new();
        let mut page: i64 = 1;
        loop {
            let resp = images_api::list_images(
                &self.config,
                images_api::ListImagesParams {
                    page: Some(page as _),
                    per_page: Some(PAGE_SIZE as _),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ProviderError::Api(format!("list images: {e}")))?;
            let last = resp.images.len() < PAGE_SIZE;
            all.extend(resp.images);
            if last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn fetch_networks(&self) -> Result<Vec<models::Network>, ProviderError> {
        let mut all = Vec::new();
        let mut page: i64 = 1;
        loop {
            let resp = networks_api::list_networks(
                &self.config,
                networks_api::ListNetworksParams {
                    page: Some(page as _),
                    per_page: Some(PAGE_SIZE as _),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ProviderError::Api(format!("list networks: {e}")))?;
            let last = resp.networks.len() < PAGE_SIZE;
            all.extend(resp.networks);
            if last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn fetch_ssh_keys(&self) -> Result<Vec<models::SshKey>, ProviderError> {
        let mut all = Vec::new();
        let mut page: i64 = 1;
        loop {
            let resp = ssh_keys_api::list_ssh_keys(
                &self.config,
                ssh_keys_api::ListSshKeysParams {
                    page: Some(page as _),
                    per_page: Some(PAGE_SIZE as _),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ProviderError::Api(format!("list ssh keys: {e}")))?;
            let last = resp.ssh_keys.len() < PAGE_SIZE;
            all.extend(resp.ssh_keys);
            if last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn fetch_firewalls(&self) -> Result<Vec<models::Firewall>, ProviderError> {
        let mut all = Vec::new();
        let mut page: i64 = 1;
        loop {
            let resp = firewalls_api::list_firewalls(
                &self.config,
                firewalls_api::ListFirewallsParams {
                    page: Some(page as _),
                    per_page: Some(PAGE_SIZE as _),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ProviderError::Api(format!("list firewalls: {e}")))?;
            let last = resp.firewalls.len() < PAGE_SIZE;
            all.extend(resp.firewalls);
            if last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }
}

/// Read a generated API enum through its wire form; unrecognized strings
/// classify as `Unknown`.
fn architecture_label<T: Serialize>(raw: &T) -> String {
    match serde_json::to_value(raw) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

#[async_trait]
impl CloudProvider for HetznerProvider {
    async fn locations(&self) -> Result<Vec<Location>, ProviderError> {
        let locations = self.fetch_locations().await?;
        Ok(locations
            .into_iter()
            .map(|l| Location {
                code: l.name,
                description: l.description,
            })
            .collect())
    }

    async fn server_types(&self) -> Result<Vec<ServerType>, ProviderError> {
        let types = self.fetch_server_types().await?;
        Ok(types
            .into_iter()
            .map(|t| {
                let architecture = Architecture::classify(&architecture_label(&t.architecture));
                ServerType {
                    name: t.name,
                    architecture,
                }
            })
            .collect())
    }

    async fn images(&self) -> Result<Vec<Image>, ProviderError> {
        let images = self.fetch_images().await?;
        Ok(images.into_iter().filter_map(Self::named_image).collect())
    }

    async fn networks(&self) -> Result<Vec<ResourceRef>, ProviderError> {
        let networks = self.fetch_networks().await?;
        Ok(networks
            .into_iter()
            .map(|n| ResourceRef {
                id: n.id,
                name: n.name,
            })
            .collect())
    }

    async fn ssh_keys(&self) -> Result<Vec<ResourceRef>, ProviderError> {
        let keys = self.fetch_ssh_keys().await?;
        Ok(keys
            .into_iter()
            .map(|k| ResourceRef {
                id: k.id,
                name: k.name,
            })
            .collect())
    }

    async fn firewalls(&self) -> Result<Vec<ResourceRef>, ProviderError> {
        let firewalls = self.fetch_firewalls().await?;
        Ok(firewalls
            .into_iter()
            .map(|f| ResourceRef {
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    /// The public cloud API does not expose account limits.
    async fn quota_remaining(&self) -> Result<Option<i64>, ProviderError> {
        Ok(None)
    }

    async fn create_server(&self, spec: &CreateSpec) -> Result<CreatedServer, ProviderError> {
        let resp = servers_api::create_server(
            &self.config,
            servers_api::CreateServerParams {
                create_server_request: models::CreateServerRequest {
                    name: spec.name.clone(),
                    server_type: spec.server_type.clone(),
                    image: spec.image.clone(),
                    location: Some(spec.location.clone()),
                    user_data: spec.user_data.clone(),
                    networks: Some(vec![spec.network_id]),
                    firewalls: Some(vec![models::CreateServerRequestFirewalls {
                        firewall: spec.firewall_id,
                    }]),
                    ssh_keys: Some(vec![spec.ssh_key_id.to_string()]),
                    volumes: None,
                    start_after_create: Some(true),
                    automount: None,
                    datacenter: None,
                    labels: Some(spec.labels.clone()),
                    placement_group: None,
                    public_net: None,
                },
            },
        )
        .await
        .map_err(Self::classify_create)?;

        let server = resp.server;
        info!(server_id = server.id, name = %server.name, "hetzner: server created");

        Ok(CreatedServer {
            id: server.id,
            name: server.name.clone(),
        })
    }

    async fn server_details(&self, id: i64) -> Result<ServerDetails, ProviderError> {
        let resp = servers_api::get_server(&self.config, servers_api::GetServerParams { id })
            .await
            .map_err(|e| {
                if Self::response_status(&e) == Some(404) {
                    ProviderError::ServerNotFound(id)
                } else {
                    ProviderError::Api(format!("get server: {e}"))
                }
            })?;

        let server = resp
            .server
            .ok_or_else(|| ProviderError::Api("server not found in response".into()))?;
        Ok(Self::details_of(&server))
    }
}
