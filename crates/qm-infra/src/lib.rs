pub mod hetzner;

use std::sync::Arc;

pub use hetzner::HetznerProvider;
use qm_core::provider::CloudProvider;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("missing env var: {0}")]
    MissingEnv(String),
}

/// Build the Hetzner Cloud provider from environment variables.
pub fn build_provider() -> Result<Arc<dyn CloudProvider>, SetupError> {
    dotenvy::dotenv().ok();

    let provider = HetznerProvider::from_env()?;
    tracing::info!("registered Hetzner Cloud provider");
    Ok(Arc::new(provider))
}
