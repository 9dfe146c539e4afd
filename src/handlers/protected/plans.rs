use axum::{extract::State, Json};
use serde::Serialize;

use crate::database::models::Plan;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

/// GET /api/plans - plans open for subscription, cheapest first
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<PlansResponse>> {
    let plans = state.plans().select_active().await?;
    Ok(Json(PlansResponse { plans }))
}
