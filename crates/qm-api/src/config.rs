use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use qm_core::provision::{DEFAULT_SERVER_TYPE, DEFAULT_SETTLE, ProvisionerConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub server_type: String,
    pub settle_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:servers.db".into()),
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".into())
                .parse()
                .expect("LISTEN_ADDR must be a valid socket address"),
            server_type: env::var("SERVER_TYPE").unwrap_or_else(|_| DEFAULT_SERVER_TYPE.into()),
            settle_secs: env::var("SETTLE_SECS")
                .unwrap_or_else(|_| DEFAULT_SETTLE.as_secs().to_string())
                .parse()
                .expect("SETTLE_SECS must be a valid u64"),
        }
    }

    pub fn provisioner_config(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            server_type: self.server_type.clone(),
            settle: Duration::from_secs(self.settle_secs),
        }
    }
}
