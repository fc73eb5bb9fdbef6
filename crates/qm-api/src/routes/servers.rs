use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use qm_core::provider::ServerDetails;
use qm_core::provision::CreateRequest;

use crate::dto::{CreateServersRequest, CreateServersResponse, MachineResult};
use crate::error::ApiError;
use crate::identity::UserId;
use crate::state::AppState;

pub async fn create_servers(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(req): Json<CreateServersRequest>,
) -> Result<(StatusCode, Json<CreateServersResponse>), ApiError> {
    let count = req.count;
    let outcomes = state
        .provisioner
        .create(CreateRequest {
            requester_id: user_id.0,
            base_name: req.name,
            location: req.location,
            image: req.image,
            app: req.app,
            count,
        })
        .await?;

    let machines: Vec<MachineResult> = outcomes.into_iter().map(MachineResult::from).collect();
    Ok((
        StatusCode::CREATED,
        Json(CreateServersResponse {
            requested: count,
            machines,
        }),
    ))
}

pub async fn get_server(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(query): Path<String>,
) -> Result<Json<ServerDetails>, ApiError> {
    let details = state.provisioner.lookup(&user_id.0, &query).await?;
    Ok(Json(details))
}
