// handlers/elevated/groups.rs - groups across all users

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::protected::groups::UpdateGroupRequest;
use crate::state::AppState;

/// GET /api/admin/groups
pub async fn list_all_groups(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let groups = state.groups().select_all().await?;
    Ok(Json(json!({ "groups": groups })))
}

/// PATCH /api/admin/groups/:id
pub async fn update_any_group(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateGroupRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let group = state.groups().select_404(id).await?;
    let update = request.into_update()?;

    // The instance must belong to the group's owner, not the admin
    if let Some(instance_id) = update.instance_id {
        state
            .instances
            .repository()
            .select_owned_404(instance_id, group.user_id)
            .await?;
    }

    let group = state.groups().update(group.id, update).await?;
    tracing::info!("Admin {} updated group {}", session.id, group.id);
    Ok(Json(json!({ "group": group })))
}

/// DELETE /api/admin/groups/:id
pub async fn delete_any_group(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    if !state.groups().delete(id).await? {
        return Err(ApiError::not_found(format!("Group {} not found", id)));
    }
    tracing::info!("Admin {} deleted group {}", session.id, id);
    Ok(Json(json!({ "success": true })))
}
