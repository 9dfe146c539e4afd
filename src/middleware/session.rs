use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{extract_token, validate_jwt};
use crate::state::AppState;

/// Inspect the session on every `/api/*` request and log what was found.
/// Never rejects; enforcement is `require_session`'s job.
pub async fn session_logger(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let security = &state.config.security;
    let path = request.uri().path().to_string();

    match extract_token(request.headers(), &security.cookie_name) {
        None => tracing::debug!(%path, "no session present"),
        Some(token) => match validate_jwt(&token, security) {
            Ok(claims) => tracing::debug!(%path, user_id = %claims.sub, role = claims.role.as_str(), "session present"),
            Err(e) => tracing::info!(%path, "invalid session: {}", e),
        },
    }

    next.run(request).await
}
