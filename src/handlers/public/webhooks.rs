// handlers/public/webhooks.rs - billing provider notifications

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use subtle::ConstantTimeEq;

use crate::error::{ApiError, ApiResult};
use crate::services::billing::{WebhookEvent, WebhookOutcome};
use crate::state::AppState;

/// Header Asaas uses to echo the webhook's configured auth token
pub const WEBHOOK_TOKEN_HEADER: &str = "asaas-access-token";

/// POST /webhooks/asaas - apply a payment/subscription notification
pub async fn asaas_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<WebhookEvent>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    verify_token(&headers, &state.config.billing.webhook_token)?;
    let Json(event) = payload?;

    let outcome = state.subscriptions.apply_webhook_event(&event).await?;
    tracing::info!("Webhook {} processed: {:?}", event.event, outcome);

    Ok(Json(json!({
        "received": true,
        "applied": outcome == WebhookOutcome::Applied,
    })))
}

fn verify_token(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    if expected.is_empty() {
        tracing::error!("Rejecting webhook: ASAAS_WEBHOOK_TOKEN is not configured");
        return Err(ApiError::unauthorized("Webhook token not configured"));
    }
    let provided = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("Rejecting webhook with invalid token");
        return Err(ApiError::unauthorized("Invalid webhook token"));
    }
    Ok(())
}
