//! Scripted test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::catalog::{Architecture, Image, Location, ResourceRef, ServerType};
use crate::provider::{
    CloudProvider, CreateSpec, CreatedServer, ProviderError, ServerDetails, ServerStatus,
};

/// In-memory [`CloudProvider`] with per-name failure injection.
pub struct MockProvider {
    locations: Mutex<Vec<Location>>,
    server_types: Mutex<Vec<ServerType>>,
    images: Mutex<Vec<Image>>,
    networks: Mutex<Vec<ResourceRef>>,
    ssh_keys: Mutex<Vec<ResourceRef>>,
    firewalls: Mutex<Vec<ResourceRef>>,
    quota: Mutex<Option<i64>>,
    images_broken: AtomicBool,
    quota_broken: AtomicBool,
    create_failures: Mutex<HashSet<String>>,
    describe_failures: Mutex<HashSet<String>>,
    create_calls: AtomicUsize,
    specs: Mutex<Vec<CreateSpec>>,
    servers: Mutex<HashMap<i64, ServerDetails>>,
    next_id: AtomicI64,
}

impl MockProvider {
    /// Two locations, an x86 and an arm server type, an x86 and an arm
    /// image, and exactly one network, SSH key, and firewall.
    pub fn with_small_catalog() -> Self {
        Self {
            locations: Mutex::new(vec![
                Location {
                    code: "fsn1".into(),
                    description: "Falkenstein".into(),
                },
                Location {
                    code: "nbg1".into(),
                    description: "Nuremberg".into(),
                },
            ]),
            server_types: Mutex::new(vec![
                ServerType {
                    name: "cx23".into(),
                    architecture: Architecture::X86,
                },
                ServerType {
                    name: "cax11".into(),
                    architecture: Architecture::Arm,
                },
            ]),
            images: Mutex::new(vec![
                Image {
                    id: 100,
                    name: "debian-12".into(),
                    architecture: Architecture::X86,
                },
                Image {
                    id: 101,
                    name: "debian-arm".into(),
                    architecture: Architecture::Arm,
                },
            ]),
            networks: Mutex::new(vec![ResourceRef {
                id: 1,
                name: "main".into(),
            }]),
            ssh_keys: Mutex::new(vec![ResourceRef {
                id: 11,
                name: "ops".into(),
            }]),
            firewalls: Mutex::new(vec![ResourceRef {
                id: 21,
                name: "default".into(),
            }]),
            quota: Mutex::new(None),
            images_broken: AtomicBool::new(false),
            quota_broken: AtomicBool::new(false),
            create_failures: Mutex::new(HashSet::new()),
            describe_failures: Mutex::new(HashSet::new()),
            create_calls: AtomicUsize::new(0),
            specs: Mutex::new(Vec::new()),
            servers: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn add_network(&self, id: i64, name: &str) {
        self.networks.lock().unwrap().push(ResourceRef {
            id,
            name: name.to_string(),
        });
    }

    pub fn set_quota(&self, remaining: Option<i64>) {
        *self.quota.lock().unwrap() = remaining;
    }

    pub fn break_images(&self) {
        self.images_broken.store(true, Ordering::SeqCst);
    }

    pub fn fail_quota(&self) {
        self.quota_broken.store(true, Ordering::SeqCst);
    }

    pub fn fail_create(&self, name: &str) {
        self.create_failures.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_describe(&self, name: &str) {
        self.describe_failures.lock().unwrap().insert(name.to_string());
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn created_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .servers
            .lock()
            .unwrap()
            .values()
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn specs(&self) -> Vec<CreateSpec> {
        self.specs.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn locations(&self) -> Result<Vec<Location>, ProviderError> {
        Ok(self.locations.lock().unwrap().clone())
    }

    async fn server_types(&self) -> Result<Vec<ServerType>, ProviderError> {
        Ok(self.server_types.lock().unwrap().clone())
    }

    async fn images(&self) -> Result<Vec<Image>, ProviderError> {
        if self.images_broken.load(Ordering::SeqCst) {
            return Err(ProviderError::Api("scripted image listing failure".into()));
        }
        Ok(self.images.lock().unwrap().clone())
    }

    async fn networks(&self) -> Result<Vec<ResourceRef>, ProviderError> {
        Ok(self.networks.lock().unwrap().clone())
    }

    async fn ssh_keys(&self) -> Result<Vec<ResourceRef>, ProviderError> {
        Ok(self.ssh_keys.lock().unwrap().clone())
    }

    async fn firewalls(&self) -> Result<Vec<ResourceRef>, ProviderError> {
        Ok(self.firewalls.lock().unwrap().clone())
    }

    async fn quota_remaining(&self) -> Result<Option<i64>, ProviderError> {
        if self.quota_broken.load(Ordering::SeqCst) {
            return Err(ProviderError::Api("scripted quota failure".into()));
        }
        Ok(*self.quota.lock().unwrap())
    }

    async fn create_server(&self, spec: &CreateSpec) -> Result<CreatedServer, ProviderError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.specs.lock().unwrap().push(spec.clone());

        if self.create_failures.lock().unwrap().contains(&spec.name) {
            return Err(ProviderError::Api("scripted create failure".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let details = ServerDetails {
            id,
            name: spec.name.clone(),
            status: ServerStatus::Running,
            server_type: spec.server_type.clone(),
            datacenter: format!("{}-dc8", spec.location),
            location: spec.location.clone(),
            ipv4: Some(format!("203.0.113.{id}")),
            ipv6: None,
            image: Some(spec.image.clone()),
        };
        self.servers.lock().unwrap().insert(id, details);
        Ok(CreatedServer {
            id,
            name: spec.name.clone(),
        })
    }

    async fn server_details(&self, id: i64) -> Result<ServerDetails, ProviderError> {
        let servers = self.servers.lock().unwrap();
        let Some(details) = servers.get(&id) else {
            return Err(ProviderError::ServerNotFound(id));
        };
        if self.describe_failures.lock().unwrap().contains(&details.name) {
            return Err(ProviderError::Api("scripted describe failure".into()));
        }
        Ok(details.clone())
    }
}
