use axum::Json;
use axum::extract::{Path, State};

use qm_core::catalog::{CatalogKind, CatalogListing, CatalogSummary};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn refresh_catalog(
    State(state): State<AppState>,
) -> Result<Json<CatalogSummary>, ApiError> {
    let snapshot = state.cache.refresh().await?;
    Ok(Json(snapshot.summary()))
}

pub async fn list_catalog(
    State(state): State<AppState>,
    Path(kind): Path<CatalogKind>,
) -> Result<Json<CatalogListing>, ApiError> {
    let snapshot = state.cache.ensure().await?;
    Ok(Json(snapshot.listing(kind)))
}
