pub mod catalog;
pub mod defaults;
pub mod servers;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::identity::identity_middleware;
use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    let authed = Router::new()
        // Catalog
        .route("/catalog/refresh", post(catalog::refresh_catalog))
        .route("/catalog/{kind}", get(catalog::list_catalog))
        // Per-user defaults and resolution preview
        .route(
            "/defaults",
            get(defaults::get_defaults).put(defaults::set_defaults),
        )
        .route("/resolve/{kind}", get(defaults::preview_resolution))
        // Servers
        .route("/servers", post(servers::create_servers))
        .route("/servers/{query}", get(servers::get_server))
        // Identity middleware
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(authed).with_state(state)
}
