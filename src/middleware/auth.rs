use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{extract_token, validate_jwt, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Session gate: rejects requests without a valid session token and injects
/// the `SessionUser` into request extensions
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let security = &state.config.security;

    let token = extract_token(request.headers(), &security.cookie_name)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let claims = validate_jwt(&token, security)?;

    request.extensions_mut().insert(SessionUser::from(claims));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Parse the `userId` carried in a query string or body
pub fn parse_user_id(raw: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("userId is required"))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("userId must be a valid UUID"))
}

/// Users act on their own records; admins may act on anyone's
pub fn authorize_user(session: &SessionUser, user_id: Uuid) -> Result<(), ApiError> {
    if session.id == user_id || session.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only access your own records"))
    }
}
