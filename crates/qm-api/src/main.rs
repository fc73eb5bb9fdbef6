mod config;
mod dto;
mod error;
mod identity;
mod routes;
mod state;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use qm_core::catalog::ResourceCache;
use qm_core::provision::Provisioner;
use qm_core::store::PreferenceStore;
use qm_db::SqliteStore;

use crate::config::AppConfig;
use crate::routes::api_router;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    // Database
    let db = qm_db::create_pool(&config.database_url)
        .await
        .expect("failed to connect to database");

    qm_db::run_migrations(&db)
        .await
        .expect("failed to run migrations");

    // Cloud provider
    let provider = qm_infra::build_provider().expect("failed to build cloud provider");

    let store: Arc<dyn PreferenceStore> = Arc::new(SqliteStore::new(db));
    let cache = Arc::new(ResourceCache::new(provider.clone()));

    // Warm the catalog; a failure here is retried lazily on first use
    if let Err(e) = cache.refresh().await {
        tracing::warn!(error = %e, "initial catalog refresh failed");
    }

    let provisioner = Arc::new(Provisioner::new(
        provider,
        store.clone(),
        cache.clone(),
        config.provisioner_config(),
    ));

    let state = AppState {
        provisioner,
        cache,
        store,
    };

    let app = api_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!(addr = %config.listen_addr, "starting provisioning API");

    axum::serve(listener, app).await.expect("server error");
}
