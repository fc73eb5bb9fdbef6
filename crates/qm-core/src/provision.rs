//! Batch provisioning of servers against a resolved placement.
//!
//! A create request moves through fixed phases: validate the inputs against
//! the catalog, resolve network/SSH key/firewall, check quota, create every
//! machine concurrently, wait once for the batch to settle, then describe
//! and record each machine. Failures after validation are isolated per
//! machine; one bad create does not abort its siblings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;

use crate::catalog::{Architecture, CatalogSnapshot, ResourceCache, ResourceRef};
use crate::cloudinit::AppProfile;
use crate::provider::{CloudProvider, CreateSpec, CreatedServer, ProviderError, ServerDetails};
use crate::resolver::{ResolveError, ResourceKind, resolve};
use crate::store::{PreferenceStore, StoreError};

pub const DEFAULT_SERVER_TYPE: &str = "cx23";
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(20);
pub const MIN_BATCH: u32 = 1;
pub const MAX_BATCH: u32 = 10;
pub const MANAGED_BY_LABEL: &str = "quartermaster";

// Mirrored in the UnknownLocation/UnknownImage error copy.
const CHOICE_LIMIT: usize = 25;

#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub server_type: String,
    pub settle: Duration,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            server_type: DEFAULT_SERVER_TYPE.to_string(),
            settle: DEFAULT_SETTLE,
        }
    }
}

/// One user-submitted batch create.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub requester_id: String,
    pub base_name: String,
    pub location: String,
    pub image: String,
    pub app: AppProfile,
    pub count: u32,
}

/// Final state of one machine in a batch, in request order.
#[derive(Debug, Clone)]
pub enum MachineOutcome {
    Ready(ServerReport),
    Failed { name: String, reason: MachineFailure },
}

#[derive(Debug, Clone)]
pub struct ServerReport {
    pub details: ServerDetails,
    /// Set when the machine exists but its ownership record could not be
    /// written.
    pub persist_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineFailure {
    #[error("create failed: {0}")]
    Create(ProviderError),
    #[error("created as server {server_id} but fetching details failed: {source}")]
    Describe { server_id: i64, source: ProviderError },
}

/// Whole-batch failure, raised before any machine is created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreateError {
    #[error("count must be between 1 and 10, got {0}")]
    InvalidCount(u32),
    #[error("server name must not be empty")]
    EmptyName,
    #[error("unknown location \"{requested}\"; available (first 25): {choices}")]
    UnknownLocation { requested: String, choices: String },
    #[error("unknown image \"{requested}\"; x86 images (first 25): {choices}")]
    UnknownImage { requested: String, choices: String },
    #[error(
        "image \"{requested}\" is not x86-compatible (architecture: {architecture}); x86 images (first 25): {choices}"
    )]
    ImageNotX86 {
        requested: String,
        architecture: Architecture,
        choices: String,
    },
    #[error("server type {0} is not available on the provider")]
    ServerTypeUnavailable(String),
    #[error("quota allows only {remaining} more servers, {requested} requested")]
    QuotaExceeded { requested: u32, remaining: i64 },
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("no server of yours matches \"{0}\"")]
    NotFound(String),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreviewError {
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

/// Machine names for a batch: the base name, then `BASE1`, `BASE2`, ...
fn machine_names(base: &str, count: u32) -> Vec<String> {
    (0..count)
        .map(|i| {
            if i == 0 {
                base.to_string()
            } else {
                format!("{base}{i}")
            }
        })
        .collect()
}

fn joined<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.take(CHOICE_LIMIT).collect::<Vec<_>>().join(", ")
}

/// Drives create requests end to end.
pub struct Provisioner {
    provider: Arc<dyn CloudProvider>,
    store: Arc<dyn PreferenceStore>,
    cache: Arc<ResourceCache>,
    config: ProvisionerConfig,
}

impl Provisioner {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        store: Arc<dyn PreferenceStore>,
        cache: Arc<ResourceCache>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            cache,
            config,
        }
    }

    /// Create a batch of servers. Returns one outcome per requested
    /// machine, in request order.
    pub async fn create(&self, request: CreateRequest) -> Result<Vec<MachineOutcome>, CreateError> {
        let base = request.base_name.trim().to_uppercase();
        if base.is_empty() {
            return Err(CreateError::EmptyName);
        }
        if !(MIN_BATCH..=MAX_BATCH).contains(&request.count) {
            return Err(CreateError::InvalidCount(request.count));
        }

        let snapshot = self.cache.ensure().await?;
        self.validate_placement(&snapshot, &request)?;

        let defaults = self.store.defaults(&request.requester_id).await?;
        let pick = |kind: ResourceKind| resolve(kind, snapshot.selectable(kind), defaults.for_kind(kind));
        let network = pick(ResourceKind::Network)?;
        let ssh_key = pick(ResourceKind::SshKey)?;
        let firewall = pick(ResourceKind::Firewall)?;

        self.check_quota(request.count).await?;

        let names = machine_names(&base, request.count);
        tracing::info!(
            user = %request.requester_id,
            base = %base,
            count = request.count,
            location = %request.location,
            image = %request.image,
            app = %request.app,
            "provisioning batch"
        );

        let created = self
            .create_all(&names, &request, &network, &ssh_key, &firewall)
            .await;

        if created.iter().any(Result::is_ok) {
            tracing::debug!(settle = ?self.config.settle, "waiting for servers to settle");
            tokio::time::sleep(self.config.settle).await;
        }

        let outcomes = self.finalize(&request.requester_id, names, created).await;
        let ready = outcomes
            .iter()
            .filter(|o| matches!(o, MachineOutcome::Ready(_)))
            .count();
        tracing::info!(ready, failed = outcomes.len() - ready, "provisioning batch finished");
        Ok(outcomes)
    }

    /// Resolution preview: the resource a create would pick right now.
    pub async fn preview(
        &self,
        user_id: &str,
        kind: ResourceKind,
    ) -> Result<ResourceRef, PreviewError> {
        let snapshot = self.cache.ensure().await?;
        let defaults = self.store.defaults(user_id).await?;
        Ok(resolve(kind, snapshot.selectable(kind), defaults.for_kind(kind))?)
    }

    /// Current details of one of the user's servers, addressed by name or
    /// numeric ID.
    pub async fn lookup(&self, user_id: &str, query: &str) -> Result<ServerDetails, LookupError> {
        let query = query.trim();
        let id = self
            .store
            .find_server(user_id, query)
            .await?
            .ok_or_else(|| LookupError::NotFound(query.to_string()))?;
        Ok(self.provider.server_details(id).await?)
    }

    fn validate_placement(
        &self,
        snapshot: &CatalogSnapshot,
        request: &CreateRequest,
    ) -> Result<(), CreateError> {
        if !snapshot.has_server_type(&self.config.server_type) {
            return Err(CreateError::ServerTypeUnavailable(
                self.config.server_type.clone(),
            ));
        }
        if !snapshot.locations.contains_key(&request.location) {
            return Err(CreateError::UnknownLocation {
                requested: request.location.clone(),
                choices: joined(snapshot.locations.keys().map(String::as_str)),
            });
        }
        match snapshot.images.get(&request.image) {
            Some(image) if image.architecture.is_x86() => Ok(()),
            Some(image) => Err(CreateError::ImageNotX86 {
                requested: request.image.clone(),
                architecture: image.architecture,
                choices: joined(snapshot.x86_images().map(|i| i.name.as_str())),
            }),
            None => Err(CreateError::UnknownImage {
                requested: request.image.clone(),
                choices: joined(snapshot.x86_images().map(|i| i.name.as_str())),
            }),
        }
    }

    /// Quota gates the batch only when the provider reports a number. An
    /// unknown or unqueryable quota falls through to the create attempt.
    async fn check_quota(&self, count: u32) -> Result<(), CreateError> {
        match self.provider.quota_remaining().await {
            Ok(Some(remaining)) if remaining < i64::from(count) => {
                Err(CreateError::QuotaExceeded {
                    requested: count,
                    remaining,
                })
            }
            Ok(Some(remaining)) => {
                tracing::debug!(remaining, count, "quota check passed");
                Ok(())
            }
            Ok(None) => {
                tracing::debug!("provider does not report quota, skipping check");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "quota lookup failed, proceeding");
                Ok(())
            }
        }
    }

    async fn create_all(
        &self,
        names: &[String],
        request: &CreateRequest,
        network: &ResourceRef,
        ssh_key: &ResourceRef,
        firewall: &ResourceRef,
    ) -> Vec<Result<CreatedServer, ProviderError>> {
        let labels: HashMap<String, String> = [
            ("managed_by".to_string(), MANAGED_BY_LABEL.to_string()),
            ("owner_id".to_string(), request.requester_id.clone()),
        ]
        .into();

        let creates = names.iter().map(|name| {
            let provider = self.provider.clone();
            let spec = CreateSpec {
                name: name.clone(),
                server_type: self.config.server_type.clone(),
                image: request.image.clone(),
                location: request.location.clone(),
                network_id: network.id,
                ssh_key_id: ssh_key.id,
                firewall_id: firewall.id,
                user_data: request.app.user_data().map(str::to_owned),
                labels: labels.clone(),
            };
            async move {
                match provider.create_server(&spec).await {
                    Ok(server) => {
                        tracing::info!(server_id = server.id, name = %server.name, "server created");
                        Ok(server)
                    }
                    Err(e) => {
                        tracing::warn!(name = %spec.name, error = %e, "server create failed");
                        Err(e)
                    }
                }
            }
        });
        join_all(creates).await
    }

    async fn finalize(
        &self,
        user_id: &str,
        names: Vec<String>,
        created: Vec<Result<CreatedServer, ProviderError>>,
    ) -> Vec<MachineOutcome> {
        let slots = names.into_iter().zip(created).map(|(name, created)| {
            let provider = self.provider.clone();
            let store = self.store.clone();
            let user_id = user_id.to_string();
            async move {
                let server = match created {
                    Ok(server) => server,
                    Err(e) => {
                        return MachineOutcome::Failed {
                            name,
                            reason: MachineFailure::Create(e),
                        };
                    }
                };
                let details = match provider.server_details(server.id).await {
                    Ok(details) => details,
                    Err(e) => {
                        tracing::warn!(server_id = server.id, error = %e, "created server could not be described");
                        return MachineOutcome::Failed {
                            name,
                            reason: MachineFailure::Describe {
                                server_id: server.id,
                                source: e,
                            },
                        };
                    }
                };
                // The provider is the source of truth; a failed ownership
                // write downgrades to a caveat on a created machine.
                let persist_error = match store
                    .record_ownership(&user_id, &details.name, details.id)
                    .await
                {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(server_id = details.id, error = %e, "ownership record failed");
                        Some(e.to_string())
                    }
                };
                MachineOutcome::Ready(ServerReport {
                    details,
                    persist_error,
                })
            }
        });
        join_all(slots).await
    }
}
