use axum::extract::{Path, State};
use axum::{Extension, Json};

use qm_core::resolver::ResourceKind;
use qm_core::store::{DefaultsUpdate, UserDefaults};

use crate::dto::PreviewResponse;
use crate::error::ApiError;
use crate::identity::UserId;
use crate::state::AppState;

pub async fn get_defaults(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<UserDefaults>, ApiError> {
    let defaults = state.store.defaults(&user_id.0).await?;
    Ok(Json(defaults))
}

pub async fn set_defaults(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(update): Json<DefaultsUpdate>,
) -> Result<Json<UserDefaults>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("set at least one default".into()));
    }

    let merged = state.store.set_defaults(&user_id.0, &update).await?;
    Ok(Json(merged))
}

pub async fn preview_resolution(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(kind): Path<ResourceKind>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let resolved = state.provisioner.preview(&user_id.0, kind).await?;
    Ok(Json(PreviewResponse { kind, resolved }))
}
