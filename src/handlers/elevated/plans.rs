// handlers/elevated/plans.rs - plan catalogue management

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{NewPlan, PlanUpdate};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/admin/plans - every plan, including retired ones
pub async fn list_all_plans(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let plans = state.plans().select_all().await?;
    Ok(Json(json!({ "plans": plans })))
}

/// POST /api/admin/plans
pub async fn create_plan(
    State(state): State<AppState>,
    payload: Result<Json<NewPlan>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(plan) = payload?;
    plan.validate().map_err(ApiError::bad_request)?;

    let plan = state.plans().create(plan).await?;
    tracing::info!("Created plan '{}' ({})", plan.name, plan.id);
    Ok((StatusCode::CREATED, Json(json!({ "plan": plan }))))
}

/// PATCH /api/admin/plans/:id - existing subscriptions keep their stored value
pub async fn update_plan(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PlanUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    update.validate().map_err(ApiError::bad_request)?;

    let plan = state.plans().update(id, update).await?;
    Ok(Json(json!({ "plan": plan })))
}
