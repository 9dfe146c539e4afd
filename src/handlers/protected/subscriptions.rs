use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::UserIdParams;
use crate::auth::SessionUser;
use crate::database::models::Subscription;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{authorize_user, parse_user_id};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: Option<String>,
    pub plan_id: Option<Uuid>,
    pub billing_type: Option<String>,
}

/// GET /api/subscriptions?userId=...
pub async fn list_subscriptions(
    State(state): State<AppState>,
    session: SessionUser,
    query: Result<Query<UserIdParams>, QueryRejection>,
) -> ApiResult<Json<SubscriptionsResponse>> {
    let Query(query) = query?;
    let user_id = parse_user_id(query.user_id.as_deref())?;
    authorize_user(&session, user_id)?;

    let subscriptions = state.subscriptions.subscriptions().select_for_user(user_id).await?;
    Ok(Json(SubscriptionsResponse { subscriptions }))
}

/// POST /api/subscriptions - subscribe to a plan
pub async fn create_subscription(
    State(state): State<AppState>,
    session: SessionUser,
    payload: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let user_id = parse_user_id(request.user_id.as_deref())?;
    authorize_user(&session, user_id)?;
    let plan_id = request.plan_id.ok_or_else(|| ApiError::bad_request("planId is required"))?;

    let subscription = state
        .subscriptions
        .subscribe(user_id, plan_id, request.billing_type)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "subscription": subscription }))))
}

/// POST /api/subscriptions/:id/reactivate - body `{ userId }`
pub async fn reactivate_subscription(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserIdParams>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let user_id = parse_user_id(body.user_id.as_deref())?;
    authorize_user(&session, user_id)?;

    let subscription = state
        .subscriptions
        .reactivate_subscription(id, user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to reactivate subscription {}: {}", id, e);
            ApiError::from(e)
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Subscription reactivated",
        "subscription": subscription,
    })))
}

/// POST /api/subscriptions/:id/cancel - body `{ userId }`
pub async fn cancel_subscription(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserIdParams>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let user_id = parse_user_id(body.user_id.as_deref())?;
    authorize_user(&session, user_id)?;

    let subscription = state.subscriptions.cancel_subscription(id, user_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Subscription canceled",
        "subscription": subscription,
    })))
}

/// POST /api/subscriptions/:id/sync - refresh payments from the provider
pub async fn sync_subscription_payments(
    State(state): State<AppState>,
    session: SessionUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserIdParams>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let user_id = parse_user_id(body.user_id.as_deref())?;
    authorize_user(&session, user_id)?;

    let payments = state.subscriptions.sync_payments(id, user_id).await?;
    Ok(Json(json!({ "payments": payments })))
}
