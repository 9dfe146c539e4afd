use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Admin gate, layered inside `require_session`.
///
/// Authority comes from `users.role`, not the token's role claim: a demoted
/// admin loses access and a promoted user gains it before their token expires.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let session = request
        .extensions()
        .get::<SessionUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    match state.users().select_one(session.id).await? {
        Some(user) if user.is_admin() => Ok(next.run(request).await),
        _ => {
            tracing::warn!("Non-admin user {} denied access to {}", session.id, request.uri().path());
            Err(ApiError::forbidden("Admin access required"))
        }
    }
}
