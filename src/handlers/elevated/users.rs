// handlers/elevated/users.rs - account administration

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::database::models::{Role, UserUpdate};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = state.users().select_all().await?;
    Ok(Json(json!({ "users": users })))
}

/// PATCH /api/admin/users/:id - rename or change role
pub async fn update_user(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AdminUserUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(request) = payload?;

    if id == session.id && request.role == Some(Role::User) {
        return Err(ApiError::bad_request("Admins cannot demote themselves"));
    }

    let name = request.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(ApiError::bad_request("name cannot be empty"));
    }

    let user = state
        .users()
        .update(
            id,
            UserUpdate {
                name,
                role: request.role,
                ..Default::default()
            },
        )
        .await?;

    tracing::info!("Admin {} updated user {} (role {})", session.id, user.id, user.role);
    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/admin/users/:id - removes the account and everything it owns
pub async fn delete_user(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    if id == session.id {
        return Err(ApiError::bad_request("Admins cannot delete their own account"));
    }

    state.users().select_404(id).await?;

    // Stop billing and free gateway instances before the rows cascade away
    let canceled = state.subscriptions.cancel_all_for_user(id).await?;
    let removed = state.instances.delete_all_for_user(id).await?;

    if !state.users().delete(id).await? {
        return Err(ApiError::not_found(format!("User {} not found", id)));
    }

    tracing::warn!(
        "Admin {} deleted user {} ({} subscription(s) canceled, {} instance(s) removed)",
        session.id,
        id,
        canceled,
        removed
    );
    Ok(Json(json!({ "success": true })))
}
