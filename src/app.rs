use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_admin, require_session, session_logger};
use crate::state::AppState;

/// Full application router
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        .merge(webhook_routes())
        // Session-protected API, with the admin tier nested inside
        .merge(api_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(public::register))
        .route("/auth/login", post(public::login))
        .route("/auth/logout", post(public::logout))
}

fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/asaas", post(public::asaas_webhook))
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .merge(billing_routes())
        .merge(instance_routes())
        .merge(group_routes())
        .merge(admin_routes(state.clone()))
        // route_layer so unknown paths stay 404 instead of 401
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .layer(from_fn_with_state(state, session_logger))
}

fn account_routes() -> Router<AppState> {
    use protected::auth;

    Router::new().route("/api/auth/me", get(auth::me))
}

fn billing_routes() -> Router<AppState> {
    use protected::{payments, plans, subscriptions};

    Router::new()
        .route("/api/plans", get(plans::list_plans))
        .route("/api/payments", get(payments::list_payments))
        .route(
            "/api/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route(
            "/api/subscriptions/:id/reactivate",
            post(subscriptions::reactivate_subscription),
        )
        .route("/api/subscriptions/:id/cancel", post(subscriptions::cancel_subscription))
        .route("/api/subscriptions/:id/sync", post(subscriptions::sync_subscription_payments))
}

fn instance_routes() -> Router<AppState> {
    use protected::instances;

    Router::new()
        .route(
            "/api/instances",
            get(instances::list_instances).post(instances::create_instance),
        )
        .route("/api/instances/:id", axum::routing::delete(instances::delete_instance))
        .route("/api/instances/:id/qrcode", get(instances::instance_qrcode))
        .route("/api/instances/:id/status", get(instances::instance_status))
        .route("/api/instances/:id/logout", post(instances::logout_instance))
        .route("/api/instances/:id/groups", get(instances::instance_groups))
}

fn group_routes() -> Router<AppState> {
    use protected::groups;

    Router::new()
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/api/groups/:id",
            patch(groups::update_group).delete(groups::delete_group),
        )
}

fn admin_routes(state: AppState) -> Router<AppState> {
    use elevated::{groups, plans, users};

    Router::new()
        .route("/api/admin/users", get(users::list_users))
        .route(
            "/api/admin/users/:id",
            patch(users::update_user).delete(users::delete_user),
        )
        .route("/api/admin/groups", get(groups::list_all_groups))
        .route(
            "/api/admin/groups/:id",
            patch(groups::update_any_group).delete(groups::delete_any_group),
        )
        .route(
            "/api/admin/plans",
            get(plans::list_all_plans).post(plans::create_plan),
        )
        .route("/api/admin/plans/:id", patch(plans::update_plan))
        .route_layer(from_fn_with_state(state, require_admin))
}

/// Permissive in development; an explicit origin list everywhere else
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
