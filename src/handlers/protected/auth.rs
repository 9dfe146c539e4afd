use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::auth::SessionUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/auth/me - profile of the session user
pub async fn me(State(state): State<AppState>, session: SessionUser) -> ApiResult<Json<Value>> {
    let user = state.users().select_404(session.id).await?;
    Ok(Json(json!({ "user": user })))
}
