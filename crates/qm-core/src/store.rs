//! Per-user preferences and the ownership registry for created servers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::resolver::ResourceKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("a server named {0} is already registered to this user")]
    DuplicateName(String),
    #[error("store error: {0}")]
    Backend(String),
}

/// Stored default resource IDs for one user. Unset fields stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserDefaults {
    pub network_id: Option<i64>,
    pub ssh_key_id: Option<i64>,
    pub firewall_id: Option<i64>,
}

impl UserDefaults {
    pub fn for_kind(&self, kind: ResourceKind) -> Option<i64> {
        match kind {
            ResourceKind::Network => self.network_id,
            ResourceKind::SshKey => self.ssh_key_id,
            ResourceKind::Firewall => self.firewall_id,
        }
    }

    fn apply(&mut self, update: &DefaultsUpdate) {
        if let Some(id) = update.network_id {
            self.network_id = Some(id);
        }
        if let Some(id) = update.ssh_key_id {
            self.ssh_key_id = Some(id);
        }
        if let Some(id) = update.firewall_id {
            self.firewall_id = Some(id);
        }
    }
}

/// Partial update of [`UserDefaults`]. Omitted fields are left alone.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DefaultsUpdate {
    pub network_id: Option<i64>,
    pub ssh_key_id: Option<i64>,
    pub firewall_id: Option<i64>,
}

impl DefaultsUpdate {
    pub fn is_empty(&self) -> bool {
        self.network_id.is_none() && self.ssh_key_id.is_none() && self.firewall_id.is_none()
    }
}

/// Durable user state: defaults plus which servers each user created.
#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    /// Stored defaults for a user, all-`None` if the user has never set any.
    async fn defaults(&self, user_id: &str) -> Result<UserDefaults, StoreError>;

    /// Merge `update` into the user's defaults and return the merged result.
    /// Fields the update leaves out keep their stored value.
    async fn set_defaults(
        &self,
        user_id: &str,
        update: &DefaultsUpdate,
    ) -> Result<UserDefaults, StoreError>;

    /// Register a created server under its owner. Names are unique per
    /// owner; a clash fails with [`StoreError::DuplicateName`].
    async fn record_ownership(
        &self,
        user_id: &str,
        server_name: &str,
        server_id: i64,
    ) -> Result<(), StoreError>;

    /// Look up one of the user's servers by name, or by numeric ID when no
    /// name matches. Returns the server ID.
    async fn find_server(&self, user_id: &str, query: &str) -> Result<Option<i64>, StoreError>;
}

#[derive(Default)]
struct Inner {
    defaults: HashMap<String, UserDefaults>,
    // (name, id) pairs per user; batches are small, linear scans are fine.
    owned: HashMap<String, Vec<(String, i64)>>,
}

/// In-memory [`PreferenceStore`] for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn defaults(&self, user_id: &str) -> Result<UserDefaults, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.defaults.get(user_id).copied().unwrap_or_default())
    }

    async fn set_defaults(
        &self,
        user_id: &str,
        update: &DefaultsUpdate,
    ) -> Result<UserDefaults, StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner.defaults.entry(user_id.to_string()).or_default();
        entry.apply(update);
        Ok(*entry)
    }

    async fn record_ownership(
        &self,
        user_id: &str,
        server_name: &str,
        server_id: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let servers = inner.owned.entry(user_id.to_string()).or_default();
        if servers.iter().any(|(name, _)| name == server_name) {
            return Err(StoreError::DuplicateName(server_name.to_string()));
        }
        servers.push((server_name.to_string(), server_id));
        Ok(())
    }

    async fn find_server(&self, user_id: &str, query: &str) -> Result<Option<i64>, StoreError> {
        let query = query.trim();
        let inner = self.inner.read().await;
        let Some(servers) = inner.owned.get(user_id) else {
            return Ok(None);
        };
        if let Some((_, id)) = servers.iter().find(|(name, _)| name.as_str() == query) {
            return Ok(Some(*id));
        }
        if let Ok(id) = query.parse::<i64>() {
            if servers.iter().any(|(_, owned_id)| *owned_id == id) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}
