use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::database::models::{Group, GroupUpdate, NewGroup};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Summary delivery time when the client doesn't pick one
const DEFAULT_SUMMARY_TIME: (u32, u32) = (20, 0);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub instance_id: Option<Uuid>,
    pub group_jid: String,
    pub name: String,
    pub summary_enabled: Option<bool>,
    pub summary_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub instance_id: Option<Uuid>,
    pub summary_enabled: Option<bool>,
    pub summary_time: Option<String>,
}

impl UpdateGroupRequest {
    pub fn into_update(self) -> Result<GroupUpdate, ApiError> {
        Ok(GroupUpdate {
            name: self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            instance_id: self.instance_id,
            summary_enabled: self.summary_enabled,
            summary_time: self.summary_time.as_deref().map(parse_summary_time).transpose()?,
        })
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`
pub fn parse_summary_time(raw: &str) -> Result<NaiveTime, ApiError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ApiError::bad_request(format!("summaryTime '{}' must be HH:MM", raw)))
}

/// WhatsApp group ids end in `@g.us`
fn validate_group_jid(jid: &str) -> Result<(), ApiError> {
    match jid.strip_suffix("@g.us") {
        Some(id) if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit() || c == '-') => Ok(()),
        _ => Err(ApiError::bad_request("groupJid must be a WhatsApp group id ending in @g.us")),
    }
}

async fn load_group(state: &AppState, session: &SessionUser, id: Uuid) -> ApiResult<Group> {
    Ok(state.groups().select_owned_404(id, session.id).await?)
}

/// GET /api/groups
pub async fn list_groups(State(state): State<AppState>, session: SessionUser) -> ApiResult<Json<Value>> {
    let groups = state.groups().select_for_user(session.id).await?;
    Ok(Json(json!({ "groups": groups })))
}

/// POST /api/groups - enroll a group; needs an active plan with room left
pub async fn create_group(
    State(state): State<AppState>,
    session: SessionUser,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let group_jid = request.group_jid.trim().to_string();
    validate_group_jid(&group_jid)?;
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let summary_time = match request.summary_time.as_deref() {
        Some(raw) => parse_summary_time(raw)?,
        None => NaiveTime::from_hms_opt(DEFAULT_SUMMARY_TIME.0, DEFAULT_SUMMARY_TIME.1, 0)
            .ok_or_else(|| ApiError::internal_server_error("invalid default summary time"))?,
    };

    let limit = state
        .subscriptions
        .subscriptions()
        .active_plan_limit(session.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("An active subscription is required to add groups"))?;

    if let Some(instance_id) = request.instance_id {
        state
            .instances
            .repository()
            .select_owned_404(instance_id, session.id)
            .await?;
    }

    let group = state
        .groups()
        .create_within_limit(
            NewGroup {
                user_id: session.id,
                instance_id: request.instance_id,
                group_jid,
                name,
                summary_enabled: request.summary_enabled.unwrap_or(true),
                summary_time,
            },
            limit,
        )
        .await?
        .ok_or_else(|| ApiError::forbidden(format!("Your plan allows at most {} group(s)", limit)))?;

    tracing::info!("User {} enrolled group {}", session.id, group.group_jid);
    Ok((StatusCode::CREATED, Json(json!({ "group": group }))))
}

/// PATCH /api/groups/:id
pub async fn update_group(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateGroupRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let group = load_group(&state, &session, id).await?;
    let update = request.into_update()?;

    if let Some(instance_id) = update.instance_id {
        state
            .instances
            .repository()
            .select_owned_404(instance_id, session.id)
            .await?;
    }

    let group = state.groups().update(group.id, update).await?;
    Ok(Json(json!({ "group": group })))
}

/// DELETE /api/groups/:id
pub async fn delete_group(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let group = load_group(&state, &session, id).await?;
    state.groups().delete(group.id).await?;
    Ok(Json(json!({ "success": true })))
}
