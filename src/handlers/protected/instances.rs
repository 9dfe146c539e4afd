use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::database::models::Instance;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub label: String,
}

/// Admins can operate any instance; users only their own
async fn load_instance(state: &AppState, session: &SessionUser, id: Uuid) -> ApiResult<Instance> {
    let repository = state.instances.repository();
    let instance = if session.is_admin() {
        repository.select_404(id).await?
    } else {
        repository.select_owned_404(id, session.id).await?
    };
    Ok(instance)
}

/// GET /api/instances - refreshed concurrently; a gateway failure keeps the stored row
pub async fn list_instances(State(state): State<AppState>, session: SessionUser) -> ApiResult<Json<Value>> {
    let stored = state.instances.repository().select_for_user(session.id).await?;
    let refreshed = join_all(stored.iter().map(|instance| state.instances.refresh_status(instance))).await;

    let instances: Vec<Instance> = stored
        .into_iter()
        .zip(refreshed)
        .map(|(instance, result)| match result {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::debug!("Keeping stored status for instance {}: {}", instance.id, e);
                instance
            }
        })
        .collect();
    Ok(Json(json!({ "instances": instances })))
}

/// POST /api/instances - body `{ label }`
pub async fn create_instance(
    State(state): State<AppState>,
    session: SessionUser,
    payload: Result<Json<CreateInstanceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let instance = state.instances.create(session.id, &request.label).await?;
    Ok((StatusCode::CREATED, Json(json!({ "instance": instance }))))
}

/// GET /api/instances/:id/qrcode - QR code for pairing a phone
pub async fn instance_qrcode(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let instance = load_instance(&state, &session, id).await?;
    let qrcode = state.instances.qr_code(&instance).await?;
    Ok(Json(json!({ "qrcode": qrcode })))
}

/// GET /api/instances/:id/status - refresh connection state from the gateway
pub async fn instance_status(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let instance = load_instance(&state, &session, id).await?;
    let instance = state.instances.refresh_status(&instance).await?;
    Ok(Json(json!({ "instance": instance })))
}

/// POST /api/instances/:id/logout - unpair the phone, keep the instance
pub async fn logout_instance(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let instance = load_instance(&state, &session, id).await?;
    let instance = state.instances.logout(&instance).await?;
    Ok(Json(json!({ "success": true, "instance": instance })))
}

/// DELETE /api/instances/:id
pub async fn delete_instance(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let instance = load_instance(&state, &session, id).await?;
    state.instances.delete(&instance).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/instances/:id/groups - groups the paired account belongs to
pub async fn instance_groups(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let instance = load_instance(&state, &session, id).await?;
    let groups = state.instances.groups(&instance).await?;
    Ok(Json(json!({ "groups": groups })))
}
