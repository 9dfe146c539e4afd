use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Serialize;

use super::UserIdParams;
use crate::auth::SessionUser;
use crate::database::models::Payment;
use crate::error::ApiResult;
use crate::middleware::{authorize_user, parse_user_id};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub payments: Vec<Payment>,
}

/// GET /api/payments?userId=... - payment history, newest first
pub async fn list_payments(
    State(state): State<AppState>,
    session: SessionUser,
    query: Result<Query<UserIdParams>, QueryRejection>,
) -> ApiResult<Json<PaymentsResponse>> {
    let Query(query) = query?;
    let user_id = parse_user_id(query.user_id.as_deref())?;
    authorize_user(&session, user_id)?;

    let payments = state.payments().select_for_user(user_id).await?;
    Ok(Json(PaymentsResponse { payments }))
}
