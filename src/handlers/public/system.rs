use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::state::AppState;

/// GET / - service information
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "resumo-api",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Subscriptions for automated WhatsApp group summaries",
        "endpoints": {
            "auth": "/auth/register, /auth/login, /auth/logout (public)",
            "webhooks": "/webhooks/asaas (provider token)",
            "me": "/api/auth/me (session)",
            "billing": "/api/plans, /api/payments, /api/subscriptions[/:id/reactivate|cancel|sync] (session)",
            "whatsapp": "/api/instances[/:id/qrcode|status|logout|groups], /api/groups[/:id] (session)",
            "admin": "/api/admin/users, /api/admin/groups, /api/admin/plans (admin)",
        }
    }))
}

/// GET /health - database connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
